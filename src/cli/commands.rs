//! CLI command handlers.
//!
//! Grounded on the teacher's `cli::commands` (colored terminal output,
//! one function per subcommand, `println!` status lines) generalized
//! from the YAML/Excel array model to the four engine operations plus
//! the `audit`/`watch` ambient tooling (SPEC_FULL §2.4/§3).

use crate::config::Config;
use crate::engine;
use crate::error::{EngineError, EngineResult};
use crate::scheduler::{formula_deps, schedule};
use colored::Colorize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn load_config(path: &Path) -> EngineResult<Config> {
    let text = fs::read_to_string(path)?;
    Config::from_json_str(&text)
}

fn load_inputs(path: Option<&Path>) -> EngineResult<HashMap<String, serde_json::Value>> {
    match path {
        None => Ok(HashMap::new()),
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let raw: serde_json::Value = serde_json::from_str(&text)?;
            match raw {
                serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
                _ => Err(EngineError::Json("inputs file must be a JSON object".to_string())),
            }
        }
    }
}

/// `ruleflow evaluate <config> [--inputs <inputs.json>]`
pub fn evaluate(config_path: PathBuf, inputs_path: Option<PathBuf>) -> EngineResult<()> {
    println!("{}", "Evaluating configuration".bold().green());
    println!("   Config: {}", config_path.display());

    let config = load_config(&config_path)?;
    let inputs = load_inputs(inputs_path.as_deref())?;
    tracing::info!(formulas = config.formulas.len(), "config loaded");

    let result = engine::evaluate(&config, &inputs)?;

    println!("{}", "Result:".bold().cyan());
    let mut keys: Vec<&String> = result.keys().collect();
    keys.sort();
    for key in keys {
        println!("   {} = {}", key.bright_blue(), result[key].to_string().bold());
    }
    Ok(())
}

/// `ruleflow validate <config>`
pub fn validate(config_path: PathBuf) -> EngineResult<()> {
    println!("{}", "Validating configuration".bold().green());
    println!("   Config: {}", config_path.display());

    let config = load_config(&config_path)?;
    let report = engine::validate(&config);

    if report.is_valid() {
        println!("{}", "No errors".bold().green());
    } else {
        println!("{}", "Errors:".bold().red());
        for error in &report.errors {
            println!("   {} {}", "x".red(), error);
            tracing::warn!(%error, "validation error");
        }
    }

    if !report.warnings.is_empty() {
        println!("{}", "Warnings:".bold().yellow());
        for warning in &report.warnings {
            println!("   {} {}", "!".yellow(), warning);
            tracing::warn!(%warning, "validation warning");
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(report.errors.into_iter().next().unwrap())
    }
}

/// `ruleflow test <config> [--inputs <inputs.json>]`
pub fn test(config_path: PathBuf, inputs_path: Option<PathBuf>) -> EngineResult<()> {
    println!("{}", "Testing configuration".bold().green());
    println!("   Config: {}", config_path.display());

    let config = load_config(&config_path)?;
    let inputs = load_inputs(inputs_path.as_deref())?;

    let outcome = engine::test(&config, &inputs);

    for error in &outcome.errors {
        println!("   {} {}", "x".red(), error);
    }
    for warning in &outcome.warnings {
        println!("   {} {}", "!".yellow(), warning);
    }

    match outcome.result {
        Some(result) => {
            println!("{}", "Result:".bold().cyan());
            let mut keys: Vec<&String> = result.keys().collect();
            keys.sort();
            for key in keys {
                println!("   {} = {}", key.bright_blue(), result[key].to_string().bold());
            }
            Ok(())
        }
        None => Err(outcome.errors.into_iter().next().unwrap_or_else(|| EngineError::ConfigurationError {
            formula_id: "test".to_string(),
            message: "validation failed with no result".to_string(),
        })),
    }
}

/// `ruleflow generate <config> [--out <file>]`
pub fn generate(config_path: PathBuf, out_path: Option<PathBuf>) -> EngineResult<()> {
    println!("{}", "Generating standalone procedure".bold().green());

    let config = load_config(&config_path)?;
    let source = engine::generate(&config)?;

    match out_path {
        Some(path) => {
            fs::write(&path, &source)?;
            println!("   Wrote {}", path.display());
        }
        None => println!("{}", source),
    }
    Ok(())
}

/// `ruleflow audit <config> <formula_id>` — grounded on the teacher's
/// `cli::commands::audit` (show a variable's dependency chain), adapted
/// to print a formula's read/write set and scheduled position (C7).
pub fn audit(config_path: PathBuf, formula_id: String) -> EngineResult<()> {
    println!("{}", "Audit trail".bold().green());
    println!("   Config: {}", config_path.display());
    println!("   Formula: {}\n", formula_id.bright_blue().bold());

    let config = load_config(&config_path)?;
    let idx = config
        .formulas
        .iter()
        .position(|f| f.id == formula_id)
        .ok_or_else(|| EngineError::ConfigurationError {
            formula_id: formula_id.clone(),
            message: "no such formula".to_string(),
        })?;

    let deps = formula_deps(&config.formulas[idx]);
    println!("{}", "Reads:".bold().cyan());
    let mut reads: Vec<&String> = deps.reads.iter().collect();
    reads.sort();
    for name in reads {
        println!("   {}", name);
    }

    println!("{}", "Writes:".bold().cyan());
    let mut writes: Vec<&String> = deps.writes.iter().collect();
    writes.sort();
    for name in writes {
        println!("   {}", name);
    }

    let order = schedule(&config)?;
    let position = order.iter().position(|&i| i == idx).unwrap();
    println!("\n   Scheduled position: {} of {}", position + 1, order.len());

    Ok(())
}

/// `ruleflow watch <config>` — revalidate whenever the backing file's
/// mtime changes. Grounded on the teacher's `cli::commands::watch`
/// (`notify` + `notify-debouncer-mini`), generalized from recalculation
/// to revalidation against the new engine.
pub fn watch(config_path: PathBuf) -> EngineResult<()> {
    use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    println!("{}", "Watching for changes".bold().green());
    println!("   Config: {}", config_path.display());
    println!("   Press Ctrl+C to stop\n");

    run_once(&config_path);

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx).map_err(|e| EngineError::Io(e.to_string()))?;
    debouncer
        .watcher()
        .watch(&config_path, notify::RecursiveMode::NonRecursive)
        .map_err(|e| EngineError::Io(e.to_string()))?;

    for result in rx {
        match result {
            Ok(events) if events.iter().any(|e| e.kind != DebouncedEventKind::AnyContinuous) => {
                crate::template_cache::clear();
                run_once(&config_path);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "watch error"),
        }
    }
    Ok(())
}

fn run_once(config_path: &Path) {
    match load_config(config_path) {
        Ok(config) => {
            let report = engine::validate(&config);
            if report.is_valid() {
                println!("{}", "OK".bold().green());
            } else {
                for error in &report.errors {
                    println!("   {} {}", "x".red(), error);
                }
            }
        }
        Err(e) => println!("   {} {}", "x".red(), e),
    }
}

use clap::{Parser, Subcommand};
use royalbit_forge::cli;
use royalbit_forge::error::EngineResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ruleflow")]
#[command(about = "A declarative rule/formula evaluation engine")]
#[command(long_about = "ruleflow - declarative rule/formula evaluation engine

Evaluates a pipeline of named formulas (arithmetic expressions,
switch/case decisions, accumulative scoring, multi-dimensional lookup
trees) against a set of inputs, or lowers the same configuration into a
standalone procedure.

COMMANDS:
  evaluate  - Run the formula pipeline and print the result map
  validate  - Static validation only, no evaluation
  test      - Validate then evaluate, collecting diagnostics
  generate  - Emit a standalone procedure for the configuration
  audit     - Show a formula's dependency chain and scheduled position
  watch     - Revalidate a configuration on every file change

EXAMPLES:
  ruleflow evaluate bmi.json --inputs inputs.json
  ruleflow validate bmi.json
  ruleflow generate bmi.json --out bmi_eval.rs
  ruleflow audit bmi.json category")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the formula pipeline and print the result map
    Evaluate {
        /// Path to the JSON configuration file
        config: PathBuf,

        /// Path to a JSON object of input values
        #[arg(short, long)]
        inputs: Option<PathBuf>,
    },

    /// Static validation only; never evaluates an expression
    Validate {
        /// Path to the JSON configuration file
        config: PathBuf,
    },

    /// Validate then evaluate, collecting diagnostics
    Test {
        /// Path to the JSON configuration file
        config: PathBuf,

        /// Path to a JSON object of sample input values
        #[arg(short, long)]
        inputs: Option<PathBuf>,
    },

    /// Emit a standalone procedure that computes the same result
    Generate {
        /// Path to the JSON configuration file
        config: PathBuf,

        /// Write the generated source to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show a formula's dependency chain and scheduled position
    Audit {
        /// Path to the JSON configuration file
        config: PathBuf,

        /// Formula id to audit
        formula: String,
    },

    /// Revalidate a configuration whenever its file changes
    Watch {
        /// Path to the JSON configuration file
        config: PathBuf,
    },
}

fn main() -> EngineResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { config, inputs } => cli::evaluate(config, inputs),
        Commands::Validate { config } => cli::validate(config),
        Commands::Test { config, inputs } => cli::test(config, inputs),
        Commands::Generate { config, out } => cli::generate(config, out),
        Commands::Audit { config, formula } => cli::audit(config, formula),
        Commands::Watch { config } => cli::watch(config),
    }
}

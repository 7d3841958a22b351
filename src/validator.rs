//! Validator (C11): static checks over a configuration, run without
//! inputs. Never evaluates an expression or predicate.

use crate::config::{Config, FormulaKind, Rule};
use crate::error::{find_similar, EngineError};
use crate::expr::parser::parse as parse_expr;
use crate::predicate::{is_valid_op, Predicate};
use crate::scheduler::{formula_deps, schedule};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<EngineError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run every static check in spec §4.10. Never touches `evaluate`.
pub fn validate(config: &Config) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_unique_ids(config, &mut report);
    check_exactly_one_kind(config, &mut report);
    check_expressions_parse(config, &mut report);
    check_operators_closed(config, &mut report);
    check_betweens_well_formed(config, &mut report);
    check_scoring_shape(config, &mut report);

    // Unresolved references and cycles both surface through the
    // scheduler, which already builds the full reads/writes graph.
    if let Err(e) = schedule(config) {
        report.errors.push(e);
    } else {
        check_unresolved_references(config, &mut report);
    }

    check_declared_inputs(config, &mut report);
    check_switch_defaults(config, &mut report);
    check_set_vars_keys(config, &mut report);

    report
}

fn all_ids(config: &Config) -> HashSet<String> {
    config
        .formulas
        .iter()
        .flat_map(|f| {
            let mut names = vec![crate::scope::normalize(&f.id).to_string()];
            if let Some(alias) = &f.alias {
                names.push(crate::scope::normalize(alias).to_string());
            }
            names
        })
        .collect()
}

fn check_unique_ids(config: &Config, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for formula in &config.formulas {
        if !seen.insert(formula.id.clone()) {
            report.errors.push(EngineError::ConfigurationError {
                formula_id: formula.id.clone(),
                message: format!("duplicate formula id '{}'", formula.id),
            });
        }
    }
}

/// Every formula has exactly one kind payload (spec §4.10). `FormulaKind`'s
/// untagged dispatch alone silently accepts a formula object carrying
/// fields from more than one kind (e.g. both `formula` and `switch`) by
/// matching whichever variant's required fields appear first and
/// dropping the rest; this check inspects the raw discriminator keys
/// `Formula`'s `Deserialize` impl recorded (`config::KIND_DISCRIMINATOR_KEYS`)
/// and rejects anything other than exactly one.
fn check_exactly_one_kind(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        if formula.kind_keys.len() != 1 {
            report.errors.push(EngineError::ConfigurationError {
                formula_id: formula.id.clone(),
                message: format!(
                    "formula must carry exactly one of {:?}, found {:?}",
                    crate::config::KIND_DISCRIMINATOR_KEYS,
                    formula.kind_keys
                ),
            });
        }
    }
}

fn check_expressions_parse(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        if let FormulaKind::Expression { formula: text, .. } = &formula.kind {
            if let Err(e) = parse_expr(text) {
                report.errors.push(e);
            }
        }
    }
}

fn walk_predicates(formula_id: &str, predicate: &Predicate, report: &mut ValidationReport) {
    match predicate {
        Predicate::And { and } => and.iter().for_each(|p| walk_predicates(formula_id, p, report)),
        Predicate::Or { or } => or.iter().for_each(|p| walk_predicates(formula_id, p, report)),
        Predicate::Leaf(leaf) => {
            if !is_valid_op(&leaf.op) {
                report.errors.push(EngineError::ConfigurationError {
                    formula_id: formula_id.to_string(),
                    message: format!("unknown predicate operator '{}'", leaf.op),
                });
            }
        }
    }
}

fn check_operators_closed(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        match &formula.kind {
            FormulaKind::Switch { when, .. } => {
                for arm in when {
                    walk_predicates(&formula.id, &arm.condition, report);
                }
            }
            FormulaKind::Rules { rules } => {
                for rule in rules {
                    match rule {
                        Rule::Ranges { ranges, .. } => {
                            for range in ranges {
                                walk_predicates(&formula.id, &range.condition, report);
                            }
                        }
                        Rule::Single { condition, .. } => walk_predicates(&formula.id, condition, report),
                    }
                }
            }
            FormulaKind::Scoring { scoring } => {
                for branch in &scoring.ifs.tree {
                    walk_predicates(&formula.id, &branch.condition, report);
                    for range in &branch.ranges {
                        walk_predicates(&formula.id, &range.condition, report);
                    }
                }
            }
            FormulaKind::Expression { .. } => {}
        }
    }
}

fn walk_betweens(formula_id: &str, predicate: &Predicate, report: &mut ValidationReport) {
    match predicate {
        Predicate::And { and } => and.iter().for_each(|p| walk_betweens(formula_id, p, report)),
        Predicate::Or { or } => or.iter().for_each(|p| walk_betweens(formula_id, p, report)),
        Predicate::Leaf(leaf) if leaf.op == "between" => {
            let bounds = leaf.value.as_array();
            let well_formed = bounds
                .filter(|b| b.len() == 2)
                .and_then(|b| Some((b[0].as_f64()?, b[1].as_f64()?)))
                .map(|(lo, hi)| lo <= hi)
                .unwrap_or(false);
            if !well_formed {
                report.errors.push(EngineError::ConfigurationError {
                    formula_id: formula_id.to_string(),
                    message: "malformed 'between': expects [low, high] with low <= high".to_string(),
                });
            }
        }
        Predicate::Leaf(_) => {}
    }
}

fn check_betweens_well_formed(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        match &formula.kind {
            FormulaKind::Switch { when, .. } => {
                for arm in when {
                    walk_betweens(&formula.id, &arm.condition, report);
                }
            }
            FormulaKind::Rules { rules } => {
                for rule in rules {
                    match rule {
                        Rule::Ranges { ranges, .. } => {
                            for range in ranges {
                                walk_betweens(&formula.id, &range.condition, report);
                            }
                        }
                        Rule::Single { condition, .. } => walk_betweens(&formula.id, condition, report),
                    }
                }
            }
            FormulaKind::Scoring { scoring } => {
                for branch in &scoring.ifs.tree {
                    walk_betweens(&formula.id, &branch.condition, report);
                    for range in &branch.ranges {
                        walk_betweens(&formula.id, &range.condition, report);
                    }
                }
            }
            FormulaKind::Expression { .. } => {}
        }
    }
}

fn check_scoring_shape(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        if let FormulaKind::Scoring { scoring } = &formula.kind {
            if scoring.ifs.tree.is_empty() {
                report.errors.push(EngineError::ConfigurationError {
                    formula_id: formula.id.clone(),
                    message: "scoring tree must have at least one branch".to_string(),
                });
            }
            for branch in &scoring.ifs.tree {
                if branch.ranges.is_empty() {
                    report.errors.push(EngineError::ConfigurationError {
                        formula_id: formula.id.clone(),
                        message: "scoring branch must have at least one range".to_string(),
                    });
                }
            }
            if scoring.ifs.vars.len() < 2 {
                report.errors.push(EngineError::ConfigurationError {
                    formula_id: formula.id.clone(),
                    message: "scoring.ifs.vars requires at least two axes".to_string(),
                });
            }
        }
    }
}

fn check_unresolved_references(config: &Config, report: &mut ValidationReport) {
    let ids = all_ids(config);
    // An input is "external" if no formula declares it as a writer; we
    // can't distinguish a genuinely missing input from one supplied at
    // evaluation time, so this only flags names that look like typos of
    // an existing id (a likely copy/paste mistake, not a real input).
    let id_list: Vec<String> = ids.iter().cloned().collect();
    for formula in &config.formulas {
        let deps = formula_deps(formula);
        for read in &deps.reads {
            if ids.contains(read) {
                continue;
            }
            if let Some(candidate) = find_similar(read, &id_list) {
                report.warnings.push(format!(
                    "formula '{}' reads '{}', which is not declared; did you mean '{}'?",
                    formula.id, read, candidate
                ));
            }
        }
    }
}

fn check_declared_inputs(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        if let FormulaKind::Expression { inputs, .. } = &formula.kind {
            let deps = formula_deps(formula);
            let declared: HashSet<String> =
                inputs.iter().map(|s| crate::scope::normalize(s).to_string()).collect();
            if declared != deps.reads {
                report.warnings.push(format!(
                    "formula '{}' declares inputs {:?} but actually reads {:?}",
                    formula.id, declared, deps.reads
                ));
            }
        }
    }
}

fn check_switch_defaults(config: &Config, report: &mut ValidationReport) {
    for formula in &config.formulas {
        if let FormulaKind::Switch { default, .. } = &formula.kind {
            if default.is_none() {
                report.warnings.push(format!(
                    "switch formula '{}' has no default; unmatched inputs yield null",
                    formula.id
                ));
            }
        }
    }
}

/// `set_vars` keys must be valid identifiers, `$`-prefix allowed (spec §3
/// invariants). Walks every `set_vars`/`default_vars` map reachable from
/// any formula kind.
fn check_set_vars_keys(config: &Config, report: &mut ValidationReport) {
    fn check_map(formula_id: &str, map: &std::collections::HashMap<String, serde_json::Value>, report: &mut ValidationReport) {
        for key in map.keys() {
            if !is_valid_identifier(key) {
                report.errors.push(EngineError::ConfigurationError {
                    formula_id: formula_id.to_string(),
                    message: format!("'set_vars' key '{}' is not a valid identifier", key),
                });
            }
        }
    }

    for formula in &config.formulas {
        match &formula.kind {
            FormulaKind::Expression { .. } => {}
            FormulaKind::Switch { when, default_vars, .. } => {
                for arm in when {
                    if let Some(set_vars) = &arm.set_vars {
                        check_map(&formula.id, set_vars, report);
                    }
                }
                if let Some(set_vars) = default_vars {
                    check_map(&formula.id, set_vars, report);
                }
            }
            FormulaKind::Rules { rules } => {
                for rule in rules {
                    match rule {
                        Rule::Ranges { ranges, .. } => {
                            for range in ranges {
                                if let Some(set_vars) = &range.set_vars {
                                    check_map(&formula.id, set_vars, report);
                                }
                            }
                        }
                        Rule::Single { set_vars, .. } => {
                            if let Some(set_vars) = set_vars {
                                check_map(&formula.id, set_vars, report);
                            }
                        }
                    }
                }
            }
            FormulaKind::Scoring { scoring } => {
                for branch in &scoring.ifs.tree {
                    for range in &branch.ranges {
                        if let Some(set_vars) = &range.set_vars {
                            check_map(&formula.id, set_vars, report);
                        }
                    }
                }
            }
        }
    }
}

/// A valid `set_vars` key: an optional leading `$`, then a letter or
/// underscore, then letters/digits/underscores (same grammar as an
/// identifier token, spec §4.2).
fn is_valid_identifier(name: &str) -> bool {
    let stripped = crate::scope::normalize(name);
    let mut chars = stripped.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

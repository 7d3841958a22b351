//! The four engine operations from spec §6: `evaluate`, `validate`,
//! `test`, and `generate`. This is the crate's public entry point —
//! callers construct a `Config` and an input map and never touch the
//! scheduler/dispatcher/validator modules directly.

use crate::codegen;
use crate::config::Config;
use crate::dispatcher;
use crate::error::EngineResult;
use crate::scope::Scope;
use crate::validator::{self, ValidationReport};
use crate::value::Value;
use std::collections::HashMap;

/// Run the formula pipeline end to end and return the populated scope as
/// a result map. Aborts on the first error; no partial results are ever
/// returned (spec §7).
pub fn evaluate(config: &Config, inputs: &HashMap<String, serde_json::Value>) -> EngineResult<HashMap<String, Value>> {
    let scope = Scope::from_inputs(inputs);
    dispatcher::run(config, scope)
}

/// Pure static validation; never evaluates an expression or predicate
/// (spec §7: "`validate` is strictly non-destructive").
pub fn validate(config: &Config) -> ValidationReport {
    validator::validate(config)
}

/// Outcome of `test`: `validate`'s diagnostics, plus a result map when
/// validation reported no errors.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub errors: Vec<crate::error::EngineError>,
    pub warnings: Vec<String>,
    pub result: Option<HashMap<String, Value>>,
}

impl TestOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate, then evaluate only if validation reported no errors.
/// Warnings never block execution (spec §7).
pub fn test(config: &Config, sample_inputs: &HashMap<String, serde_json::Value>) -> TestOutcome {
    let report = validator::validate(config);
    if !report.is_valid() {
        return TestOutcome {
            errors: report.errors,
            warnings: report.warnings,
            result: None,
        };
    }

    match evaluate(config, sample_inputs) {
        Ok(result) => TestOutcome {
            errors: report.errors,
            warnings: report.warnings,
            result: Some(result),
        },
        Err(e) => TestOutcome {
            errors: vec![e],
            warnings: report.warnings,
            result: None,
        },
    }
}

/// Emit the standalone procedure for `config` (spec §4.9).
pub fn generate(config: &Config) -> EngineResult<String> {
    codegen::generate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn evaluate_bmi_example() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "bmi", "formula": "round((weight/((height/100)**2)),2)",
                  "inputs": ["weight","height"], "as": "$bmi_value" },
                { "id": "category", "switch": "$bmi_value",
                  "when": [
                    { "if": {"op":"<","value":18.5}, "result":"Underweight" },
                    { "if": {"op":"between","value":[18.5,24.9]}, "result":"Normal" },
                    { "if": {"op":">=","value":25}, "result":"Overweight" }
                  ] }
            ]}"#,
        );
        let inputs: HashMap<String, serde_json::Value> =
            [("weight".to_string(), serde_json::json!(70)), ("height".to_string(), serde_json::json!(175))]
                .into_iter()
                .collect();
        let result = evaluate(&config, &inputs).unwrap();
        assert_eq!(result.get("category").unwrap().to_string(), "Normal");
    }

    #[test]
    fn idempotent_evaluation_does_not_mutate_inputs() {
        let config = config_from(
            r#"{"formulas": [{ "id": "doubled", "formula": "x * 2", "inputs": ["x"] }]}"#,
        );
        let inputs: HashMap<String, serde_json::Value> = [("x".to_string(), serde_json::json!(21))].into_iter().collect();
        let first = evaluate(&config, &inputs).unwrap();
        let second = evaluate(&config, &inputs).unwrap();
        assert_eq!(first.get("doubled").unwrap().as_number(), second.get("doubled").unwrap().as_number());
        assert_eq!(inputs.get("x").unwrap(), &serde_json::json!(21));
    }

    #[test]
    fn test_runs_validate_before_evaluate_and_blocks_on_errors() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "A", "formula": "B+1", "inputs": ["B"] },
                { "id": "B", "formula": "A+1", "inputs": ["A"] }
            ]}"#,
        );
        let outcome = test(&config, &HashMap::new());
        assert!(!outcome.is_valid());
        assert!(outcome.result.is_none());
    }

    #[test]
    fn test_runs_evaluate_when_only_warnings_present() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "category", "switch": "bmi",
                  "when": [{ "if": {"op":"<","value":18.5}, "result":"Underweight" }] }
            ]}"#,
        );
        let inputs: HashMap<String, serde_json::Value> = [("bmi".to_string(), serde_json::json!(15))].into_iter().collect();
        let outcome = test(&config, &inputs);
        assert!(outcome.is_valid());
        assert!(!outcome.warnings.is_empty());
        assert!(outcome.result.is_some());
    }

    #[test]
    fn generate_produces_source_for_accepted_config() {
        let config = config_from(
            r#"{"formulas": [{ "id": "doubled", "formula": "x * 2", "inputs": ["x"] }]}"#,
        );
        assert!(validate(&config).is_valid());
        let source = generate(&config).unwrap();
        assert!(source.contains("pub fn eval("));
    }
}

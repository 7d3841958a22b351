//! Formula dispatcher (C8): drives the scheduled formulas through the
//! per-kind evaluator and writes their outputs back into the scope.

use crate::config::{Config, FormulaKind};
use crate::error::EngineError;
use crate::expr::{eval as eval_expr, parse as parse_expr};
use crate::predicate;
use crate::scheduler::schedule;
use crate::scope::Scope;
use crate::scoring::{apply_set_vars, eval_rules, eval_scoring};
use crate::value::Value;
use std::collections::HashMap;

/// Run every formula in `config` in scheduled order against `scope`,
/// mutating it in place and returning the final result map.
pub fn run(config: &Config, mut scope: Scope) -> Result<HashMap<String, Value>, EngineError> {
    let order = schedule(config)?;

    for idx in order {
        let formula = &config.formulas[idx];
        let result = match &formula.kind {
            FormulaKind::Expression { formula: text, .. } => {
                let ast = parse_expr(text)?;
                eval_expr(&ast, &mut scope, &formula.id)?
            }
            FormulaKind::Switch { switch, when, default, default_vars } => {
                let context = scope.get(switch).cloned().ok_or_else(|| EngineError::MissingInput(switch.clone()))?;
                let mut matched = None;
                for arm in when {
                    if predicate::eval(&arm.condition, &mut scope, &context, &formula.id)? {
                        if let Some(set_vars) = &arm.set_vars {
                            apply_set_vars(set_vars, &mut scope, &formula.id)?;
                        }
                        matched = Some(Value::from_json(&arm.result));
                        break;
                    }
                }
                match matched {
                    Some(v) => v,
                    None => {
                        if let Some(set_vars) = default_vars {
                            apply_set_vars(set_vars, &mut scope, &formula.id)?;
                        }
                        match default {
                            Some(v) => Value::from_json(v),
                            None => Value::Null,
                        }
                    }
                }
            }
            FormulaKind::Rules { rules } => Value::Number(eval_rules(rules, &mut scope, &formula.id)?),
            FormulaKind::Scoring { scoring } => {
                let outcome = eval_scoring(scoring, &mut scope, &formula.id)?;
                for (field, raw) in &outcome.custom {
                    let key = format!("{}_{}", formula.id, field);
                    scope.set(&key, Value::from_json(raw));
                }
                Value::Number(outcome.score)
            }
        };

        scope.set(&formula.id, result.clone());
        if let Some(alias) = &formula.alias {
            scope.set(alias, result);
        }
    }

    Ok(scope.into_result_map())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap as StdHashMap;

    fn run_json(config_json: &str, inputs: &[(&str, serde_json::Value)]) -> Result<HashMap<String, Value>, EngineError> {
        let config: Config = serde_json::from_str(config_json).unwrap();
        let inputs: StdHashMap<String, serde_json::Value> =
            inputs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let scope = Scope::from_inputs(&inputs);
        run(&config, scope)
    }

    #[test]
    fn bmi_and_category() {
        let result = run_json(
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
            &[("weight", serde_json::json!(70)), ("height", serde_json::json!(175))],
        )
        .unwrap();

        assert_eq!(result.get("bmi").unwrap().as_number(), Some(22.86));
        assert_eq!(result.get("bmi_value").unwrap().as_number(), Some(22.86));
        assert_eq!(result.get("category").unwrap().to_string(), "Normal");
    }

    #[test]
    fn missing_input_surfaces() {
        let err = run_json(
            r#"{"formulas": [
                { "id": "bmi", "formula": "weight + height", "inputs": ["weight","height"] }
            ]}"#,
            &[("weight", serde_json::json!(70))],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingInput(name) if name == "height"));
    }

    #[test]
    fn switch_default_branch() {
        let result = run_json(
            r#"{"formulas": [
                { "id": "tier", "switch": "score",
                  "when": [{ "if": {"op":">=","value":100}, "result":"gold" }],
                  "default": "bronze" }
            ]}"#,
            &[("score", serde_json::json!(10))],
        )
        .unwrap();
        assert_eq!(result.get("tier").unwrap().to_string(), "bronze");
    }
}

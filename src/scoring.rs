//! Scoring & rules evaluator (C9): the accumulative `rules` dialect and
//! the two-level multi-dimensional `scoring` decision tree.

use crate::config::{Rule, ScoringRange, ScoringSpec};
use crate::error::EngineError;
use crate::expr::{eval as eval_expr, parse as parse_expr};
use crate::predicate;
use crate::scope::Scope;
use crate::value::Value;
use std::collections::HashMap;

/// Result of a matched scoring range: the bare score plus any custom
/// fields, which the caller writes under `<formula_id>_<field>`.
pub struct ScoringOutcome {
    pub score: f64,
    pub custom: HashMap<String, serde_json::Value>,
}

/// Execute an accumulative `rules` formula, returning the summed score.
/// `set_vars` on a matched range/rule are applied immediately, atomically
/// with the match (spec §3/§4.7).
pub fn eval_rules(rules: &[Rule], scope: &mut Scope, formula_id: &str) -> Result<f64, EngineError> {
    let mut total = 0.0;
    for rule in rules {
        match rule {
            Rule::Ranges { var, ranges } => {
                let context = scope.get(var).cloned().ok_or_else(|| EngineError::MissingInput(var.clone()))?;
                for range in ranges {
                    if predicate::eval(&range.condition, scope, &context, formula_id)? {
                        total += range.score;
                        if let Some(set_vars) = &range.set_vars {
                            apply_set_vars(set_vars, scope, formula_id)?;
                        }
                        break;
                    }
                }
            }
            Rule::Single { var, condition, score, set_vars } => {
                let context = scope.get(var).cloned().ok_or_else(|| EngineError::MissingInput(var.clone()))?;
                if predicate::eval(condition, scope, &context, formula_id)? {
                    total += score;
                    if let Some(set_vars) = set_vars {
                        apply_set_vars(set_vars, scope, formula_id)?;
                    }
                }
            }
        }
    }
    Ok(total)
}

/// Execute a multi-dimensional `scoring` formula (spec §4.8). Returns
/// `NoMatch` when no branch/range matches, per the spec's explicit
/// resolution of that open question.
pub fn eval_scoring(spec: &ScoringSpec, scope: &mut Scope, formula_id: &str) -> Result<ScoringOutcome, EngineError> {
    if spec.ifs.vars.len() < 2 {
        return Err(EngineError::ConfigurationError {
            formula_id: formula_id.to_string(),
            message: "scoring.ifs.vars requires at least two axes".to_string(),
        });
    }
    let axis0 = scope
        .get(&spec.ifs.vars[0])
        .cloned()
        .ok_or_else(|| EngineError::MissingInput(spec.ifs.vars[0].clone()))?;
    let axis1 = scope
        .get(&spec.ifs.vars[1])
        .cloned()
        .ok_or_else(|| EngineError::MissingInput(spec.ifs.vars[1].clone()))?;

    for branch in &spec.ifs.tree {
        if predicate::eval(&branch.condition, scope, &axis0, formula_id)? {
            if let Some(outcome) = eval_ranges(&branch.ranges, scope, &axis1, formula_id)? {
                return Ok(outcome);
            }
        }
    }
    Err(EngineError::NoMatch(formula_id.to_string()))
}

fn eval_ranges(
    ranges: &[ScoringRange],
    scope: &mut Scope,
    axis1: &Value,
    formula_id: &str,
) -> Result<Option<ScoringOutcome>, EngineError> {
    for range in ranges {
        if predicate::eval(&range.condition, scope, axis1, formula_id)? {
            if let Some(set_vars) = &range.set_vars {
                apply_set_vars(set_vars, scope, formula_id)?;
            }
            return Ok(Some(ScoringOutcome {
                score: range.score,
                custom: range.custom.clone(),
            }));
        }
    }
    Ok(None)
}

/// `set_vars` values that look like expressions are evaluated against the
/// current scope before being stored; everything else is a literal
/// (spec §9): a value is an expression iff it contains `$+-*/()` and is
/// not already a numeric or boolean literal.
pub fn apply_set_vars(
    set_vars: &HashMap<String, serde_json::Value>,
    scope: &mut Scope,
    formula_id: &str,
) -> Result<(), EngineError> {
    for (key, raw) in set_vars {
        let value = match raw {
            serde_json::Value::String(s) if looks_like_expression(s) => {
                let ast = parse_expr(s)?;
                eval_expr(&ast, scope, formula_id)?
            }
            other => Value::from_json(other),
        };
        scope.set(key, value);
    }
    Ok(())
}

fn looks_like_expression(s: &str) -> bool {
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        return false;
    }
    if s.parse::<f64>().is_ok() {
        return false;
    }
    s.contains(['$', '+', '-', '*', '/', '(', ')'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, FormulaKind};

    fn rules_from(json: &str) -> Vec<Rule> {
        let config: Config = serde_json::from_str(json).unwrap();
        match config.formulas.into_iter().next().unwrap().kind {
            FormulaKind::Rules { rules } => rules,
            other => panic!("expected Rules, got {:?}", other),
        }
    }

    fn scoring_from(json: &str) -> ScoringSpec {
        let config: Config = serde_json::from_str(json).unwrap();
        match config.formulas.into_iter().next().unwrap().kind {
            FormulaKind::Scoring { scoring } => scoring,
            other => panic!("expected Scoring, got {:?}", other),
        }
    }

    #[test]
    fn accumulative_credit_score() {
        let rules = rules_from(
            r#"{"formulas":[{ "id": "score", "rules": [
                { "var": "income", "ranges": [
                    { "if": {"op":">=","value":50000}, "score":25 },
                    { "if": {"op":">=","value":30000}, "score":15 }
                ] },
                { "var": "has_property", "if": {"op":"==","value":1}, "score":20 }
            ] }]}"#,
        );
        let mut scope = Scope::new();
        scope.set("income", Value::Number(55000.0));
        scope.set("has_property", Value::Number(1.0));
        assert_eq!(eval_rules(&rules, &mut scope, "score").unwrap(), 45.0);

        let mut scope2 = Scope::new();
        scope2.set("income", Value::Number(29000.0));
        scope2.set("has_property", Value::Number(0.0));
        assert_eq!(eval_rules(&rules, &mut scope2, "score").unwrap(), 0.0);
    }

    #[test]
    fn scoring_tree_first_match() {
        let spec = scoring_from(
            r#"{"formulas":[{ "id": "risk", "scoring": { "ifs": {
                "vars": ["risk", "trend"],
                "tree": [
                    { "if": {"op":">=","value":50}, "ranges": [
                        { "if": {"op":">=","value":2}, "score":0, "decision":"STOP" },
                        { "if": {"op":"<","value":2}, "score":10, "decision":"OK" }
                    ] },
                    { "if": {"op":">=","value":0}, "ranges": [
                        { "if": {"op":">=","value":2}, "score":5, "decision":"WATCH" }
                    ] }
                ]
            } } }]}"#,
        );
        let mut scope = Scope::new();
        scope.set("risk", Value::Number(60.0));
        scope.set("trend", Value::Number(3.0));
        let outcome = eval_scoring(&spec, &mut scope, "risk").unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.custom.get("decision").unwrap(), "STOP");
    }

    #[test]
    fn scoring_no_match_is_diagnostic() {
        let spec = scoring_from(
            r#"{"formulas":[{ "id": "risk", "scoring": { "ifs": {
                "vars": ["risk", "trend"],
                "tree": [
                    { "if": {"op":">=","value":999}, "ranges": [
                        { "if": {"op":">=","value":0}, "score":1 }
                    ] }
                ]
            } } }]}"#,
        );
        let mut scope = Scope::new();
        scope.set("risk", Value::Number(1.0));
        scope.set("trend", Value::Number(1.0));
        let err = eval_scoring(&spec, &mut scope, "risk").unwrap_err();
        assert!(matches!(err, EngineError::NoMatch(id) if id == "risk"));
    }

    #[test]
    fn set_vars_distinguishes_expression_from_literal() {
        assert!(!looks_like_expression("42"));
        assert!(!looks_like_expression("true"));
        assert!(looks_like_expression("$a + 1"));
        assert!(looks_like_expression("(a)"));
    }
}

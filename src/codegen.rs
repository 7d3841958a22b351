//! Code generator (C10): lowers a validated configuration into a
//! standalone Rust source string that computes the same result map
//! without re-traversing the configuration or calling back into this
//! crate at runtime (spec §4.9).
//!
//! Grounded on the teacher's `excel::formula_translator::FormulaTranslator`
//! (a lowering pass that walks parsed formula text and emits target-syntax
//! text instead of evaluating it) generalized from Excel cell references to
//! a Rust function body, and on `scheduler::schedule` for the emission
//! order.

use crate::config::{Config, Formula, FormulaKind, Rule};
use crate::error::EngineError;
use crate::expr::ast::Expr;
use crate::expr::parser::parse as parse_expr;
use crate::predicate::Predicate;
use crate::scheduler::schedule;
use std::fmt::Write as _;

/// Emit a standalone `eval` procedure for `config`. Callers should run
/// `validate` first; `generate` re-derives scheduling order itself but
/// does not repeat the full static validation pass.
pub fn generate(config: &Config) -> Result<String, EngineError> {
    let order = schedule(config)?;

    let mut out = String::new();
    out.push_str(PRELUDE);
    out.push_str(
        "\npub fn eval(inputs: &std::collections::HashMap<String, serde_json::Value>) \
         -> Result<std::collections::HashMap<String, serde_json::Value>, GeneratedError> {\n",
    );
    out.push_str("    let mut scope: std::collections::HashMap<String, serde_json::Value> = inputs.clone();\n");

    for idx in order {
        let formula = &config.formulas[idx];
        writeln!(out, "\n    // formula: {}", formula.id).unwrap();
        emit_formula(&mut out, formula)?;
    }

    out.push_str("\n    Ok(scope)\n}\n");
    Ok(out)
}

/// Helpers shared by every generated procedure: value coercion, the
/// closed predicate-operator set, and the built-in function set,
/// reimplemented standalone so the output never calls back into this
/// crate at runtime.
const PRELUDE: &str = r#"// Generated by the rule/formula evaluation engine. Do not edit by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedError {
    MissingInput(String),
    TypeMismatch(String),
    ArithmeticError(String),
    NoMatch(String),
}

impl std::fmt::Display for GeneratedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratedError::MissingInput(name) => write!(f, "missing input '{}'", name),
            GeneratedError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            GeneratedError::ArithmeticError(msg) => write!(f, "arithmetic error: {}", msg),
            GeneratedError::NoMatch(id) => write!(f, "no matching branch for '{}'", id),
        }
    }
}

impl std::error::Error for GeneratedError {}

fn fetch(
    scope: &std::collections::HashMap<String, serde_json::Value>,
    name: &str,
) -> Result<serde_json::Value, GeneratedError> {
    scope
        .get(name)
        .cloned()
        .ok_or_else(|| GeneratedError::MissingInput(name.to_string()))
}

fn as_number(v: &serde_json::Value) -> Result<f64, GeneratedError> {
    match v {
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| GeneratedError::TypeMismatch("non-finite number".to_string())),
        serde_json::Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| GeneratedError::TypeMismatch(format!("'{}' is not numeric", s))),
        other => Err(GeneratedError::TypeMismatch(format!("{:?} is not numeric", other))),
    }
}

fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    if let (Ok(x), Ok(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    match (a, b) {
        (serde_json::Value::Array(x), serde_json::Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        (serde_json::Value::Null, serde_json::Value::Null) => true,
        _ => a.to_string().trim_matches('"') == b.to_string().trim_matches('"'),
    }
}

fn membership(needle: &serde_json::Value, haystack: &serde_json::Value) -> bool {
    haystack
        .as_array()
        .map(|items| items.iter().any(|item| values_equal(needle, item)))
        .unwrap_or(false)
}

fn round_half_away_from_zero(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    let rounded = if scaled >= 0.0 { (scaled + 0.5).floor() } else { (scaled - 0.5).ceil() };
    rounded / factor
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
"#;

fn emit_formula(out: &mut String, formula: &Formula) -> Result<(), EngineError> {
    match &formula.kind {
        FormulaKind::Expression { formula: text, .. } => {
            let ast = parse_expr(text)?;
            let value_var = format!("{}_value", safe_ident(&formula.id));
            match bool_rooted(&ast) {
                Some((op, l, r)) => {
                    let cond = lower_binary_bool_root(op, l, r);
                    writeln!(out, "    let {}: bool = {};", value_var, cond).unwrap();
                }
                None => {
                    let expr_code = lower_expr(&ast);
                    writeln!(out, "    let {} = {};", value_var, expr_code).unwrap();
                }
            }
            emit_store_scalar(out, formula, &value_var);
        }
        FormulaKind::Switch { switch, when, default, default_vars } => {
            writeln!(out, "    let switch_ctx = fetch(&scope, \"{}\")?;", norm(switch)).unwrap();
            writeln!(out, "    let result_value: serde_json::Value;").unwrap();
            writeln!(out, "    if false {{").unwrap();
            writeln!(out, "        unreachable!();").unwrap();
            for arm in when {
                let cond = lower_predicate(&arm.condition, "switch_ctx")?;
                writeln!(out, "    }} else if {} {{", cond).unwrap();
                if let Some(set_vars) = &arm.set_vars {
                    emit_set_vars(out, set_vars, "        ")?;
                }
                writeln!(out, "        result_value = serde_json::json!({});", json_literal(&arm.result)).unwrap();
            }
            writeln!(out, "    }} else {{").unwrap();
            if let Some(set_vars) = default_vars {
                emit_set_vars(out, set_vars, "        ")?;
            }
            match default {
                Some(v) => writeln!(out, "        result_value = serde_json::json!({});", json_literal(v)).unwrap(),
                None => writeln!(out, "        result_value = serde_json::Value::Null;").unwrap(),
            }
            writeln!(out, "    }}").unwrap();
            emit_store(out, formula, "result_value");
        }
        FormulaKind::Rules { rules } => {
            writeln!(out, "    let mut {}_score: f64 = 0.0;", safe_ident(&formula.id)).unwrap();
            for rule in rules {
                match rule {
                    Rule::Ranges { var, ranges } => {
                        writeln!(out, "    {{").unwrap();
                        writeln!(out, "        let ctx = fetch(&scope, \"{}\")?;", norm(var)).unwrap();
                        for (i, range) in ranges.iter().enumerate() {
                            let cond = lower_predicate(&range.condition, "ctx")?;
                            let kw = if i == 0 { "if" } else { "} else if" };
                            writeln!(out, "        {} {} {{", kw, cond).unwrap();
                            writeln!(out, "            {}_score += {};", safe_ident(&formula.id), range.score).unwrap();
                            if let Some(set_vars) = &range.set_vars {
                                emit_set_vars(out, set_vars, "            ")?;
                            }
                        }
                        if !ranges.is_empty() {
                            writeln!(out, "        }}").unwrap();
                        }
                        writeln!(out, "    }}").unwrap();
                    }
                    Rule::Single { var, condition, score, set_vars } => {
                        writeln!(out, "    {{").unwrap();
                        writeln!(out, "        let ctx = fetch(&scope, \"{}\")?;", norm(var)).unwrap();
                        let cond = lower_predicate(condition, "ctx")?;
                        writeln!(out, "        if {} {{", cond).unwrap();
                        writeln!(out, "            {}_score += {};", safe_ident(&formula.id), score).unwrap();
                        if let Some(set_vars) = set_vars {
                            emit_set_vars(out, set_vars, "            ")?;
                        }
                        writeln!(out, "        }}").unwrap();
                        writeln!(out, "    }}").unwrap();
                    }
                }
            }
            emit_store_scalar(out, formula, &format!("{}_score", safe_ident(&formula.id)));
        }
        FormulaKind::Scoring { scoring } => {
            if scoring.ifs.vars.len() < 2 {
                return Err(EngineError::ConfigurationError {
                    formula_id: formula.id.clone(),
                    message: "scoring.ifs.vars requires at least two axes".to_string(),
                });
            }
            writeln!(out, "    let axis0 = fetch(&scope, \"{}\")?;", norm(&scoring.ifs.vars[0])).unwrap();
            writeln!(out, "    let axis1 = fetch(&scope, \"{}\")?;", norm(&scoring.ifs.vars[1])).unwrap();
            writeln!(out, "    let mut {}_matched = false;", safe_ident(&formula.id)).unwrap();
            writeln!(out, "    let mut {}_score: f64 = 0.0;", safe_ident(&formula.id)).unwrap();
            let mut custom_fields: Vec<String> = scoring
                .ifs
                .tree
                .iter()
                .flat_map(|b| b.ranges.iter())
                .flat_map(|r| r.custom.keys().cloned())
                .collect();
            custom_fields.sort();
            custom_fields.dedup();
            for field in &custom_fields {
                writeln!(
                    out,
                    "    let mut {}_{}: serde_json::Value = serde_json::Value::Null;",
                    safe_ident(&formula.id),
                    safe_ident(field)
                )
                .unwrap();
            }
            for branch in &scoring.ifs.tree {
                let bcond = lower_predicate(&branch.condition, "axis0")?;
                writeln!(out, "    if {} {{", bcond).unwrap();
                for (i, range) in branch.ranges.iter().enumerate() {
                    let rcond = lower_predicate(&range.condition, "axis1")?;
                    let kw = if i == 0 { "if" } else { "} else if" };
                    writeln!(out, "        {} {} {{", kw, rcond).unwrap();
                    writeln!(out, "            {}_matched = true;", safe_ident(&formula.id)).unwrap();
                    writeln!(out, "            {}_score = {};", safe_ident(&formula.id), range.score).unwrap();
                    for (field, raw) in &range.custom {
                        writeln!(
                            out,
                            "            {}_{} = serde_json::json!({});",
                            safe_ident(&formula.id),
                            safe_ident(field),
                            json_literal(raw)
                        )
                        .unwrap();
                    }
                    if let Some(set_vars) = &range.set_vars {
                        emit_set_vars(out, set_vars, "            ")?;
                    }
                }
                if !branch.ranges.is_empty() {
                    writeln!(out, "        }}").unwrap();
                }
                writeln!(out, "    }}").unwrap();
            }
            writeln!(
                out,
                "    if !{}_matched {{ return Err(GeneratedError::NoMatch(\"{}\".to_string())); }}",
                safe_ident(&formula.id),
                formula.id
            )
            .unwrap();
            for field in &custom_fields {
                writeln!(
                    out,
                    "    scope.insert(\"{}_{}\".to_string(), {}_{});",
                    formula.id,
                    field,
                    safe_ident(&formula.id),
                    safe_ident(field)
                )
                .unwrap();
            }
            emit_store_scalar(out, formula, &format!("{}_score", safe_ident(&formula.id)));
        }
    }
    Ok(())
}

fn emit_store(out: &mut String, formula: &Formula, value_var: &str) {
    writeln!(out, "    scope.insert(\"{}\".to_string(), {}.clone());", formula.id, value_var).unwrap();
    if let Some(alias) = &formula.alias {
        writeln!(out, "    scope.insert(\"{}\".to_string(), {});", norm(alias), value_var).unwrap();
    }
}

/// Store any `serde_json::json!`-serializable local (`f64` or `bool`) under
/// the formula's id and alias. `json!` picks the right `serde_json::Value`
/// variant from the Rust type of `value_var`, so the same emission works
/// whether the evaluator would have produced `Value::Number` or `Value::Bool`
/// for this formula (spec §8 testable property #6: codegen must match the
/// interpreter's result map exactly, booleans included).
fn emit_store_scalar(out: &mut String, formula: &Formula, value_var: &str) {
    writeln!(
        out,
        "    scope.insert(\"{}\".to_string(), serde_json::json!({}));",
        formula.id, value_var
    )
    .unwrap();
    if let Some(alias) = &formula.alias {
        writeln!(
            out,
            "    scope.insert(\"{}\".to_string(), serde_json::json!({}));",
            norm(alias),
            value_var
        )
        .unwrap();
    }
}

fn emit_set_vars(
    out: &mut String,
    set_vars: &std::collections::HashMap<String, serde_json::Value>,
    indent: &str,
) -> Result<(), EngineError> {
    let mut keys: Vec<&String> = set_vars.keys().collect();
    keys.sort();
    for key in keys {
        let raw = &set_vars[key];
        let code = match raw {
            serde_json::Value::String(s) if looks_like_expression(s) => {
                let ast = parse_expr(s)?;
                format!("serde_json::json!({})", lower_expr(&ast))
            }
            other => format!("serde_json::json!({})", json_literal(other)),
        };
        writeln!(out, "{}scope.insert(\"{}\".to_string(), {});", indent, norm(key), code).unwrap();
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

/// Lower an expression AST to a Rust `f64` expression, fetching identifiers
/// through the generated `fetch`/`as_number` prelude helpers.
fn lower_expr(expr: &Expr) -> String {
    match expr {
        Expr::Num(n) => format!("({:?}_f64)", n),
        Expr::Ident(name) => format!("as_number(&fetch(&scope, \"{}\")?)?", norm(name)),
        Expr::Unary(op, operand) => match op.as_str() {
            "-" => format!("(-({}))", lower_expr(operand)),
            _ => format!("/* unknown unary {} */ ({})", op, lower_expr(operand)),
        },
        Expr::Bin(op, l, r) => lower_binary(op, l, r),
        Expr::Call(name, args) => lower_call(name, args),
    }
}

/// Operators whose live-evaluator result is a genuine `Value::Bool` (spec
/// §4.3: `eval_binary` returns `Bool` for comparisons and `&&`/`||`, `Number`
/// for everything else). Only matters at an expression's root — nested
/// occurrences of these operators are already lowered to a 0.0/1.0-coerced
/// `f64` by `lower_binary`, matching `eval_number`'s coercion of a `Bool`
/// operand via `as_number`.
const BOOL_ROOT_OPS: &[&str] = &["==", "!=", "<", "<=", ">", ">=", "&&", "||"];

/// If `expr`'s root node is one of `BOOL_ROOT_OPS`, return its operator and
/// operands so the caller can lower it as a `bool` local instead of the
/// usual numeric-coerced form.
fn bool_rooted(expr: &Expr) -> Option<(&str, &Expr, &Expr)> {
    match expr {
        Expr::Bin(op, l, r) if BOOL_ROOT_OPS.contains(&op.as_str()) => Some((op.as_str(), l, r)),
        _ => None,
    }
}

/// Lower a root-level comparison/logical node to a Rust `bool` expression
/// (no `as i32 as f64` cast) — the counterpart to `lower_binary`'s numeric
/// coercion used when the same operator appears nested inside arithmetic.
fn lower_binary_bool_root(op: &str, l: &Expr, r: &Expr) -> String {
    let (lc, rc) = (lower_expr(l), lower_expr(r));
    match op {
        "&&" => format!("((({}) != 0.0) && (({}) != 0.0))", lc, rc),
        "||" => format!("((({}) != 0.0) || (({}) != 0.0))", lc, rc),
        "==" => format!("(({}) == ({}))", lc, rc),
        "!=" => format!("(({}) != ({}))", lc, rc),
        "<" => format!("(({}) < ({}))", lc, rc),
        "<=" => format!("(({}) <= ({}))", lc, rc),
        ">" => format!("(({}) > ({}))", lc, rc),
        ">=" => format!("(({}) >= ({}))", lc, rc),
        _ => unreachable!("bool_rooted only returns ops in BOOL_ROOT_OPS"),
    }
}

fn lower_binary(op: &str, l: &Expr, r: &Expr) -> String {
    let (lc, rc) = (lower_expr(l), lower_expr(r));
    match op {
        "+" => format!("({} + {})", lc, rc),
        "-" => format!("({} - {})", lc, rc),
        "*" => format!("({} * {})", lc, rc),
        "/" => format!(
            "(if {r} == 0.0 {{ return Err(GeneratedError::ArithmeticError(\"division by zero\".to_string())); }} else {{ {l} / {r} }})",
            l = lc,
            r = rc
        ),
        "**" => format!("({}).powf({})", lc, rc),
        "&&" => format!("((({}) != 0.0) && (({}) != 0.0))", lc, rc),
        "||" => format!("((({}) != 0.0) || (({}) != 0.0))", lc, rc),
        "==" => format!("((({}) == ({})) as i32 as f64)", lc, rc),
        "!=" => format!("((({}) != ({})) as i32 as f64)", lc, rc),
        "<" => format!("((({}) < ({})) as i32 as f64)", lc, rc),
        "<=" => format!("((({}) <= ({})) as i32 as f64)", lc, rc),
        ">" => format!("((({}) > ({})) as i32 as f64)", lc, rc),
        ">=" => format!("((({}) >= ({})) as i32 as f64)", lc, rc),
        _ => format!("/* unknown operator {} */ 0.0", op),
    }
}

fn lower_call(name: &str, args: &[Expr]) -> String {
    let argc: Vec<String> = args.iter().map(lower_expr).collect();
    match name {
        "abs" => format!("({}).abs()", argc[0]),
        "sqrt" => format!("({}).sqrt()", argc[0]),
        "ceil" => format!("({}).ceil()", argc[0]),
        "floor" => format!("({}).floor()", argc[0]),
        "pow" => format!("({}).powf({})", argc[0], argc[1]),
        "round" => {
            let decimals = if argc.len() == 2 { format!("({}) as i32", argc[1]) } else { "0".to_string() };
            format!("round_half_away_from_zero({}, {})", argc[0], decimals)
        }
        "min" => format!("[{}].into_iter().fold(f64::INFINITY, f64::min)", argc.join(", ")),
        "max" => format!("[{}].into_iter().fold(f64::NEG_INFINITY, f64::max)", argc.join(", ")),
        "sum" => format!("[{}].into_iter().sum::<f64>()", argc.join(", ")),
        "avg" => format!(
            "([{}].into_iter().sum::<f64>() / ({}_f64))",
            argc.join(", "),
            argc.len()
        ),
        "variance" => format!("population_variance(&[{}])", argc.join(", ")),
        "stddev" => format!("population_variance(&[{}]).sqrt()", argc.join(", ")),
        _ => format!("/* unknown function {} */ 0.0", name),
    }
}

/// Lower a predicate tree to a Rust `bool` expression. `context` is the
/// name of an already-bound local holding a `serde_json::Value` used by
/// leaves with no explicit `var` (spec §4.5).
fn lower_predicate(predicate: &Predicate, context: &str) -> Result<String, EngineError> {
    Ok(match predicate {
        Predicate::And { and } => {
            if and.is_empty() {
                "true".to_string()
            } else {
                let parts: Result<Vec<String>, EngineError> =
                    and.iter().map(|p| lower_predicate(p, context)).collect();
                format!("({})", parts?.join(" && "))
            }
        }
        Predicate::Or { or } => {
            if or.is_empty() {
                "false".to_string()
            } else {
                let parts: Result<Vec<String>, EngineError> = or.iter().map(|p| lower_predicate(p, context)).collect();
                format!("({})", parts?.join(" || "))
            }
        }
        Predicate::Leaf(leaf) => {
            let operand = match &leaf.var {
                Some(name) => format!("fetch(&scope, \"{}\")?", norm(name)),
                None => context.to_string(),
            };
            let literal = format!("serde_json::json!({})", json_literal(&leaf.value));
            match leaf.op.as_str() {
                "==" => format!("values_equal(&{}, &{})", operand, literal),
                "!=" => format!("!values_equal(&{}, &{})", operand, literal),
                "<" => format!("(as_number(&{})? < as_number(&{})?)", operand, literal),
                "<=" => format!("(as_number(&{})? <= as_number(&{})?)", operand, literal),
                ">" => format!("(as_number(&{})? > as_number(&{})?)", operand, literal),
                ">=" => format!("(as_number(&{})? >= as_number(&{})?)", operand, literal),
                "between" => {
                    let bounds = leaf.value.as_array().ok_or_else(|| EngineError::ConfigurationError {
                        formula_id: "generate".to_string(),
                        message: "'between' value must be a two-element list".to_string(),
                    })?;
                    if bounds.len() != 2 {
                        return Err(EngineError::ConfigurationError {
                            formula_id: "generate".to_string(),
                            message: "'between' expects exactly 2 bounds".to_string(),
                        });
                    }
                    format!(
                        "(as_number(&{})? >= {:?}_f64 && as_number(&{})? <= {:?}_f64)",
                        operand,
                        bounds[0].as_f64().unwrap_or(f64::NAN),
                        operand,
                        bounds[1].as_f64().unwrap_or(f64::NAN)
                    )
                }
                "in" => format!("membership(&{}, &{})", operand, literal),
                "not_in" => format!("!membership(&{}, &{})", operand, literal),
                other => {
                    return Err(EngineError::ConfigurationError {
                        formula_id: "generate".to_string(),
                        message: format!("unknown predicate operator '{}'", other),
                    })
                }
            }
        }
    })
}

/// Render a raw JSON value as a `serde_json::json!` macro argument.
fn json_literal(value: &serde_json::Value) -> String {
    value.to_string()
}

fn norm(name: &str) -> String {
    crate::scope::normalize(name).to_string()
}

fn safe_ident(name: &str) -> String {
    crate::scope::normalize(name).replace(|c: char| !c.is_alphanumeric() && c != '_', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config_from(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn generates_function_signature() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "bmi", "formula": "round((weight/((height/100)**2)),2)",
                  "inputs": ["weight","height"], "as": "$bmi_value" }
            ]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(source.contains("pub fn eval("));
        assert!(source.contains("GeneratedError"));
        assert!(source.contains("round_half_away_from_zero"));
    }

    #[test]
    fn emits_switch_ladder() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "category", "switch": "bmi",
                  "when": [
                    { "if": {"op":"<","value":18.5}, "result":"Underweight" },
                    { "if": {"op":"between","value":[18.5,24.9]}, "result":"Normal" }
                  ],
                  "default": "Overweight" }
            ]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(source.contains("if (as_number(&switch_ctx)? < as_number(&serde_json::json!(18.5))?)"));
        assert!(source.contains("} else {"));
        assert!(source.contains("Overweight"));
    }

    #[test]
    fn emits_rules_accumulator() {
        let config = config_from(
            r#"{"formulas":[{ "id": "score", "rules": [
                { "var": "income", "ranges": [
                    { "if": {"op":">=","value":50000}, "score":25 },
                    { "if": {"op":">=","value":30000}, "score":15 }
                ] },
                { "var": "has_property", "if": {"op":"==","value":1}, "score":20 }
            ] }]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(source.contains("score_score"));
        assert!(source.contains("score_score += 25"));
    }

    #[test]
    fn emits_scoring_tree_with_custom_fields_and_nomatch_guard() {
        let config = config_from(
            r#"{"formulas":[{ "id": "risk", "scoring": { "ifs": {
                "vars": ["risk", "trend"],
                "tree": [
                    { "if": {"op":">=","value":50}, "ranges": [
                        { "if": {"op":">=","value":2}, "score":0, "decision":"STOP" }
                    ] }
                ]
            } } }]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(source.contains("risk_matched"));
        assert!(source.contains("GeneratedError::NoMatch"));
        assert!(source.contains("risk_decision"));
    }

    #[test]
    fn boolean_rooted_expression_stores_as_bool() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "is_adult", "formula": "age >= 18", "inputs": ["age"] }
            ]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(source.contains("let is_adult_value: bool ="));
        assert!(!source.contains("as i32 as f64"));
    }

    #[test]
    fn logical_rooted_expression_stores_as_bool() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "eligible", "formula": "age >= 18 && has_id", "inputs": ["age", "has_id"] }
            ]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(source.contains("let eligible_value: bool ="));
    }

    #[test]
    fn nested_comparison_still_coerces_to_number() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "total", "formula": "a + (b > c)", "inputs": ["a", "b", "c"] }
            ]}"#,
        );
        let source = generate(&config).unwrap();
        assert!(!source.contains("let total_value: bool ="));
        assert!(source.contains("as i32 as f64"));
    }

    #[test]
    fn rejects_generation_on_cyclic_config() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "A", "formula": "B+1", "inputs": ["B"] },
                { "id": "B", "formula": "A+1", "inputs": ["A"] }
            ]}"#,
        );
        let err = generate(&config).unwrap_err();
        assert!(matches!(err, EngineError::DependencyError { .. }));
    }
}

//! Expression evaluator (C4): walks the AST against a scope, invoking
//! built-in functions. Never calls a host interpreter.

use super::ast::Expr;
use crate::error::EngineError;
use crate::scope::Scope;
use crate::value::Value;

/// Closed set of built-in function names (spec §4.3/§6).
const BUILTINS: &[&str] = &[
    "abs", "min", "max", "sqrt", "pow", "round", "ceil", "floor", "avg", "sum", "stddev",
    "variance",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Evaluate an expression to a numeric `Value::Number` against `scope`.
pub fn eval(expr: &Expr, scope: &mut Scope, formula_id: &str) -> Result<Value, EngineError> {
    match expr {
        Expr::Num(n) => Ok(Value::Number(*n)),

        Expr::Ident(name) => scope.get(name).cloned().ok_or_else(|| EngineError::MissingInput(name.clone())),

        Expr::Unary(op, operand) => {
            let v = eval_number(operand, scope, formula_id)?;
            match op.as_str() {
                "-" => Ok(Value::Number(-v)),
                _ => Err(EngineError::ConfigurationError {
                    formula_id: formula_id.to_string(),
                    message: format!("unknown unary operator '{}'", op),
                }),
            }
        }

        Expr::Bin(op, left, right) => eval_binary(op, left, right, scope, formula_id),

        Expr::Call(name, args) => eval_call(name, args, scope, formula_id),
    }
}

/// Convenience: evaluate and require a number, raising `TypeMismatch`
/// when the operand isn't numeric or numeric-coercible.
fn eval_number(expr: &Expr, scope: &mut Scope, formula_id: &str) -> Result<f64, EngineError> {
    let value = eval(expr, scope, formula_id)?;
    value.as_number().ok_or_else(|| EngineError::TypeMismatch {
        expected: "number".to_string(),
        got: value.type_name().to_string(),
        where_: formula_id.to_string(),
    })
}

fn eval_binary(
    op: &str,
    left: &Expr,
    right: &Expr,
    scope: &mut Scope,
    formula_id: &str,
) -> Result<Value, EngineError> {
    // Logical combinators short-circuit (spec §4.5 applies the same rule
    // inside expressions that use && / ||).
    match op {
        "&&" => {
            let l = eval_number(left, scope, formula_id)? != 0.0;
            if !l {
                return Ok(Value::Bool(false));
            }
            let r = eval_number(right, scope, formula_id)? != 0.0;
            return Ok(Value::Bool(r));
        }
        "||" => {
            let l = eval_number(left, scope, formula_id)? != 0.0;
            if l {
                return Ok(Value::Bool(true));
            }
            let r = eval_number(right, scope, formula_id)? != 0.0;
            return Ok(Value::Bool(r));
        }
        _ => {}
    }

    let l = eval_number(left, scope, formula_id)?;
    let r = eval_number(right, scope, formula_id)?;

    match op {
        "+" => Ok(Value::Number(l + r)),
        "-" => Ok(Value::Number(l - r)),
        "*" => Ok(Value::Number(l * r)),
        "/" => {
            if r == 0.0 {
                Err(EngineError::ArithmeticError {
                    formula_id: formula_id.to_string(),
                    message: "division by zero".to_string(),
                })
            } else {
                Ok(Value::Number(l / r))
            }
        }
        "**" => Ok(Value::Number(l.powf(r))),
        "==" => Ok(Value::Bool(l == r)),
        "!=" => Ok(Value::Bool(l != r)),
        "<" => Ok(Value::Bool(l < r)),
        "<=" => Ok(Value::Bool(l <= r)),
        ">" => Ok(Value::Bool(l > r)),
        ">=" => Ok(Value::Bool(l >= r)),
        _ => Err(EngineError::ConfigurationError {
            formula_id: formula_id.to_string(),
            message: format!("unknown operator '{}'", op),
        }),
    }
}

fn eval_call(name: &str, args: &[Expr], scope: &mut Scope, formula_id: &str) -> Result<Value, EngineError> {
    if !is_builtin(name) {
        return Err(EngineError::ConfigurationError {
            formula_id: formula_id.to_string(),
            message: format!("unknown function '{}'", name),
        });
    }

    let nums = |args: &[Expr], scope: &mut Scope| -> Result<Vec<f64>, EngineError> {
        args.iter().map(|a| eval_number(a, scope, formula_id)).collect()
    };

    match name {
        "abs" => {
            require_args(name, args, 1, 1, formula_id)?;
            Ok(Value::Number(eval_number(&args[0], scope, formula_id)?.abs()))
        }
        "sqrt" => {
            require_args(name, args, 1, 1, formula_id)?;
            let v = eval_number(&args[0], scope, formula_id)?;
            if v < 0.0 {
                return Err(EngineError::ArithmeticError {
                    formula_id: formula_id.to_string(),
                    message: "sqrt of a negative number".to_string(),
                });
            }
            Ok(Value::Number(v.sqrt()))
        }
        "ceil" => {
            require_args(name, args, 1, 1, formula_id)?;
            Ok(Value::Number(eval_number(&args[0], scope, formula_id)?.ceil()))
        }
        "floor" => {
            require_args(name, args, 1, 1, formula_id)?;
            Ok(Value::Number(eval_number(&args[0], scope, formula_id)?.floor()))
        }
        "pow" => {
            require_args(name, args, 2, 2, formula_id)?;
            let base = eval_number(&args[0], scope, formula_id)?;
            let exp = eval_number(&args[1], scope, formula_id)?;
            Ok(Value::Number(base.powf(exp)))
        }
        "round" => {
            require_args(name, args, 1, 2, formula_id)?;
            let v = eval_number(&args[0], scope, formula_id)?;
            let decimals = if args.len() == 2 {
                eval_number(&args[1], scope, formula_id)? as i32
            } else {
                0
            };
            Ok(Value::Number(round_half_away_from_zero(v, decimals)))
        }
        "min" => {
            require_min_args(name, args, 2, formula_id)?;
            let values = nums(args, scope)?;
            Ok(Value::Number(values.into_iter().fold(f64::INFINITY, f64::min)))
        }
        "max" => {
            require_min_args(name, args, 2, formula_id)?;
            let values = nums(args, scope)?;
            Ok(Value::Number(values.into_iter().fold(f64::NEG_INFINITY, f64::max)))
        }
        "sum" => {
            require_min_args(name, args, 2, formula_id)?;
            let values = nums(args, scope)?;
            Ok(Value::Number(values.into_iter().sum()))
        }
        "avg" => {
            require_min_args(name, args, 2, formula_id)?;
            let values = nums(args, scope)?;
            let n = values.len() as f64;
            Ok(Value::Number(values.into_iter().sum::<f64>() / n))
        }
        "variance" => {
            require_min_args(name, args, 2, formula_id)?;
            let values = nums(args, scope)?;
            Ok(Value::Number(population_variance(&values)))
        }
        "stddev" => {
            require_min_args(name, args, 2, formula_id)?;
            let values = nums(args, scope)?;
            Ok(Value::Number(population_variance(&values).sqrt()))
        }
        _ => unreachable!("is_builtin guards the closed set"),
    }
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Round half-away-from-zero to `decimals` places (spec §4.4).
fn round_half_away_from_zero(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    rounded / factor
}

fn require_args(
    func: &str,
    args: &[Expr],
    min: usize,
    max: usize,
    formula_id: &str,
) -> Result<(), EngineError> {
    if args.len() < min || args.len() > max {
        return Err(EngineError::ConfigurationError {
            formula_id: formula_id.to_string(),
            message: format!(
                "'{}' expects between {} and {} arguments, got {}",
                func,
                min,
                max,
                args.len()
            ),
        });
    }
    Ok(())
}

fn require_min_args(func: &str, args: &[Expr], min: usize, formula_id: &str) -> Result<(), EngineError> {
    if args.len() < min {
        return Err(EngineError::ConfigurationError {
            formula_id: formula_id.to_string(),
            message: format!("'{}' expects at least {} arguments, got {}", func, min, args.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;
    use std::collections::HashMap;

    fn scope_with(vars: &[(&str, f64)]) -> Scope {
        let inputs: HashMap<String, serde_json::Value> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
            .collect();
        Scope::from_inputs(&inputs)
    }

    fn eval_str(formula: &str, scope: &mut Scope) -> Result<Value, EngineError> {
        let expr = parse(formula).unwrap();
        eval(&expr, scope, "test")
    }

    #[test]
    fn bmi_formula() {
        let mut scope = scope_with(&[("weight", 70.0), ("height", 175.0)]);
        let v = eval_str("round((weight/((height/100)**2)),2)", &mut scope).unwrap();
        assert_eq!(v.as_number(), Some(22.86));
    }

    #[test]
    fn division_by_zero_errors() {
        let mut scope = scope_with(&[("a", 1.0), ("b", 0.0)]);
        let err = eval_str("a / b", &mut scope).unwrap_err();
        assert!(matches!(err, EngineError::ArithmeticError { .. }));
    }

    #[test]
    fn unknown_variable_errors() {
        let mut scope = Scope::new();
        let err = eval_str("missing + 1", &mut scope).unwrap_err();
        assert!(matches!(err, EngineError::MissingInput(name) if name == "missing"));
    }

    #[test]
    fn unary_minus_power_precedence() {
        // spec §9: unary minus is looser than `**`, so -2 ** 2 == -(2**2) == -4.
        let mut scope = Scope::new();
        let v = eval_str("-2 ** 2", &mut scope).unwrap();
        assert_eq!(v.as_number(), Some(-4.0));
    }

    #[test]
    fn power_right_associative() {
        let mut scope = Scope::new();
        let v = eval_str("2 ** 3 ** 2", &mut scope).unwrap();
        assert_eq!(v.as_number(), Some(512.0));
    }

    #[test]
    fn round_half_away_from_zero_behavior() {
        assert_eq!(round_half_away_from_zero(2.5, 0), 3.0);
        assert_eq!(round_half_away_from_zero(-2.5, 0), -3.0);
        assert_eq!(round_half_away_from_zero(1.005, 2), 1.01);
    }

    #[test]
    fn variadic_builtins() {
        let mut scope = Scope::new();
        assert_eq!(eval_str("max(1, 5, 3)", &mut scope).unwrap().as_number(), Some(5.0));
        assert_eq!(eval_str("min(1, 5, 3)", &mut scope).unwrap().as_number(), Some(1.0));
        assert_eq!(eval_str("sum(1, 2, 3)", &mut scope).unwrap().as_number(), Some(6.0));
        assert_eq!(eval_str("avg(2, 4)", &mut scope).unwrap().as_number(), Some(3.0));
    }

    #[test]
    fn unknown_function_is_configuration_error() {
        let mut scope = Scope::new();
        let err = eval_str("bogus(1)", &mut scope).unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationError { .. }));
    }

    #[test]
    fn string_coerces_in_arithmetic() {
        let inputs: HashMap<String, serde_json::Value> =
            [("x".to_string(), serde_json::json!("10"))].into_iter().collect();
        let mut scope = Scope::from_inputs(&inputs);
        let v = eval_str("x + 5", &mut scope).unwrap();
        assert_eq!(v.as_number(), Some(15.0));
    }
}

//! The tagged value model (C1): number, string, bool, list, null.
//!
//! Coercion only ever happens at configuration-ingest boundaries (reading
//! a raw JSON value out of a configuration) — arithmetic and predicate
//! evaluation never silently reinterpret a tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically tagged value flowing through the scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    List(Vec<Value>),
    Null,
}

impl Value {
    /// Ingest a raw JSON scalar/array into a `Value`, applying the
    /// ingest-boundary coercions spec §3 describes: `"true"`/`"false"`
    /// strings become bools, numeric-looking strings become numbers, and
    /// `"[...]"`-bracketed strings are parsed as lists. Anything else that
    /// doesn't coerce stays a string.
    pub fn from_json(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::coerce_str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Null,
        }
    }

    fn coerce_str(s: &str) -> Value {
        let trimmed = s.trim();
        match trimmed {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Number(n);
        }
        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
            let inner = &trimmed[1..trimmed.len() - 1];
            let items: Vec<Value> = if inner.trim().is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(|part| Self::coerce_str(part.trim())).collect()
            };
            return Value::List(items);
        }
        Value::String(s.to_string())
    }

    /// Tag name, used in `TypeMismatch` diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Null => "null",
        }
    }

    /// Numeric view, coercing a numeric-looking string or a bool. Does not
    /// coerce lists or null — those are `TypeMismatch`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::List(_) | Value::Null => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Lexicographic/numeric equality used by `==`/`!=` predicate leaves
/// (spec §4.5): numeric when both sides coerce to a number, otherwise a
/// plain string compare.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return l == r;
    }
    match (left, right) {
        (Value::List(l), Value::List(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Value::Null, Value::Null) => true,
        _ => left.to_string() == right.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_bool_strings() {
        assert!(matches!(
            Value::from_json(&serde_json::json!("true")),
            Value::Bool(true)
        ));
        assert!(matches!(
            Value::from_json(&serde_json::json!("false")),
            Value::Bool(false)
        ));
    }

    #[test]
    fn coerces_numeric_strings() {
        match Value::from_json(&serde_json::json!("42.5")) {
            Value::Number(n) => assert_eq!(n, 42.5),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn coerces_bracketed_list_strings() {
        match Value::from_json(&serde_json::json!("[1, 2, 3]")) {
            Value::List(items) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn leaves_plain_strings_alone() {
        match Value::from_json(&serde_json::json!("hello")) {
            Value::String(s) => assert_eq!(s, "hello"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn values_equal_numeric_coercion() {
        assert!(values_equal(&Value::Number(5.0), &Value::String("5".into())));
        assert!(!values_equal(&Value::Number(5.0), &Value::String("six".into())));
    }
}

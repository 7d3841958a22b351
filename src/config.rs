//! Configuration types (§3): the JSON-shaped wire format, deserialized
//! once at ingest into these typed records.

use crate::predicate::Predicate;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub formulas: Vec<Formula>,
}

/// The top-level keys that discriminate a formula's kind. Spec §4.10
/// requires every formula to carry exactly one of these; `FormulaKind`'s
/// `#[serde(untagged)]` dispatch alone can't enforce that (it silently
/// matches the first variant whose required fields are present and
/// ignores the rest), so `Formula`'s manual `Deserialize` impl below
/// records which of these were actually present for the validator to
/// check (`validator::check_exactly_one_kind`).
pub const KIND_DISCRIMINATOR_KEYS: &[&str] = &["formula", "switch", "rules", "scoring"];

#[derive(Debug, Clone)]
pub struct Formula {
    pub id: String,
    pub alias: Option<String>,
    pub kind: FormulaKind,
    /// Which of `KIND_DISCRIMINATOR_KEYS` were present on the source
    /// object, in encounter order. Exactly one is well-formed; zero
    /// already fails `FormulaKind`'s untagged dispatch, so in practice
    /// this is only ever empty (unreachable past a successful parse) or
    /// carries more than one entry (the shape spec §4.10 rejects).
    pub kind_keys: Vec<String>,
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let mut obj = match value {
            serde_json::Value::Object(map) => map,
            _ => return Err(de::Error::custom("formula must be a JSON object")),
        };

        let id = match obj.remove("id") {
            Some(serde_json::Value::String(s)) => s,
            Some(_) => return Err(de::Error::custom("'id' must be a string")),
            None => return Err(de::Error::missing_field("id")),
        };
        let alias = match obj.remove("as") {
            None => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(_) => return Err(de::Error::custom("'as' must be a string")),
        };

        let kind_keys: Vec<String> = KIND_DISCRIMINATOR_KEYS
            .iter()
            .filter(|key| obj.contains_key(**key))
            .map(|key| key.to_string())
            .collect();

        let kind = FormulaKind::deserialize(serde_json::Value::Object(obj)).map_err(de::Error::custom)?;

        Ok(Formula { id, alias, kind, kind_keys })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormulaKind {
    Expression {
        formula: String,
        #[serde(default)]
        inputs: Vec<String>,
    },
    Switch {
        switch: String,
        when: Vec<WhenArm>,
        #[serde(default)]
        default: Option<serde_json::Value>,
        #[serde(default)]
        default_vars: Option<HashMap<String, serde_json::Value>>,
    },
    Rules {
        rules: Vec<Rule>,
    },
    Scoring {
        scoring: ScoringSpec,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhenArm {
    #[serde(rename = "if")]
    pub condition: Predicate,
    pub result: serde_json::Value,
    #[serde(default)]
    pub set_vars: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    Ranges {
        var: String,
        ranges: Vec<RangeArm>,
    },
    Single {
        var: String,
        #[serde(rename = "if")]
        condition: Predicate,
        score: f64,
        #[serde(default)]
        set_vars: Option<HashMap<String, serde_json::Value>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RangeArm {
    #[serde(rename = "if")]
    pub condition: Predicate,
    pub score: f64,
    #[serde(default)]
    pub set_vars: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSpec {
    pub ifs: Ifs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ifs {
    pub vars: Vec<String>,
    pub tree: Vec<Branch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    #[serde(rename = "if")]
    pub condition: Predicate,
    pub ranges: Vec<ScoringRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringRange {
    #[serde(rename = "if")]
    pub condition: Predicate,
    pub score: f64,
    #[serde(default)]
    pub set_vars: Option<HashMap<String, serde_json::Value>>,
    /// Arbitrary extra fields (spec §4.8), flowing into `<id>_<field>`.
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, crate::error::EngineError> {
        serde_json::from_str(text).map_err(crate::error::EngineError::from)
    }
}

//! Variable scope (C6): a mutable name→value map with `$`-prefix
//! normalization and write-set dependency tracking.

use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// Strip a leading `$`, if present — the one place normalization happens
/// (spec §9: normalize once, never scatter "strip-if-present" checks).
pub fn normalize(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

/// The mutable map threaded through evaluation. Inputs are written once at
/// construction and never mutated afterward; formula outputs are appended
/// monotonically.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: HashMap<String, Value>,
    /// Names actually read during evaluation so far, for the scheduler's
    /// "declared inputs vs actual reads" validation diagnostic (§4.1).
    reads: HashSet<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inputs(inputs: &HashMap<String, serde_json::Value>) -> Self {
        let mut scope = Self::new();
        for (k, v) in inputs {
            scope.values.insert(normalize(k).to_string(), Value::from_json(v));
        }
        scope
    }

    pub fn get(&mut self, name: &str) -> Option<&Value> {
        let key = normalize(name);
        self.reads.insert(key.to_string());
        self.values.get(key)
    }

    /// Read without recording a dependency-tracking hit; used by
    /// diagnostics/codegen which inspect the scope without "using" it.
    pub fn peek(&self, name: &str) -> Option<&Value> {
        self.values.get(normalize(name))
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(normalize(name).to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(normalize(name))
    }

    pub fn reads(&self) -> &HashSet<String> {
        &self.reads
    }

    /// Extract the final scope as a plain result map (JSON-ready).
    pub fn into_result_map(self) -> HashMap<String, Value> {
        self.values
    }

    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

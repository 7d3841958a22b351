//! A declarative rule/formula evaluation engine.
//!
//! Given a [`config::Config`] describing a pipeline of named formulas —
//! arithmetic expressions, switch/case decisions, accumulative scoring,
//! and multi-dimensional lookup trees — together with a set of input
//! values, [`engine::evaluate`] produces a result map containing every
//! formula's output plus any auxiliary variables side-written during
//! evaluation. [`engine::generate`] lowers the same configuration into a
//! standalone procedure that computes the result without re-traversing
//! the configuration.
//!
//! # Example
//!
//! ```
//! use royalbit_forge::config::Config;
//! use royalbit_forge::engine;
//! use std::collections::HashMap;
//!
//! let config: Config = serde_json::from_str(r#"{
//!     "formulas": [
//!         { "id": "bmi", "formula": "round((weight/((height/100)**2)),2)",
//!           "inputs": ["weight", "height"] }
//!     ]
//! }"#).unwrap();
//!
//! let inputs: HashMap<String, serde_json::Value> =
//!     [("weight".to_string(), serde_json::json!(70)), ("height".to_string(), serde_json::json!(175))]
//!         .into_iter()
//!         .collect();
//!
//! let result = engine::evaluate(&config, &inputs).unwrap();
//! assert_eq!(result.get("bmi").unwrap().as_number(), Some(22.86));
//! ```

pub mod cli;
pub mod codegen;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod expr;
pub mod predicate;
pub mod scheduler;
pub mod scope;
pub mod scoring;
pub mod template_cache;
pub mod validator;
pub mod value;

pub use error::{EngineError, EngineResult};
pub use value::Value;

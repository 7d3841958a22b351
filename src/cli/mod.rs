//! CLI command handlers.

pub mod commands;

pub use commands::{audit, evaluate, generate, test, validate, watch};

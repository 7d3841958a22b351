use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// The closed set of error kinds the engine can raise (spec §7).
///
/// Every engine operation (`evaluate`, `validate`, `test`, `generate`)
/// returns one of these; propagation is all-or-nothing — no partial
/// results are ever exposed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    /// Shape/validation problems found before evaluation: unknown formula
    /// kind, missing `id`, malformed `between`, unknown operator, etc.
    #[error("configuration error in '{formula_id}': {message}")]
    ConfigurationError {
        formula_id: String,
        message: String,
    },

    /// A cycle or unresolved reference among formula names.
    #[error("dependency error: {message} (participants: {})", participants.join(", "))]
    DependencyError {
        message: String,
        participants: Vec<String>,
    },

    /// A required value was not in the scope when a formula ran.
    #[error("missing input '{0}'")]
    MissingInput(String),

    /// Arithmetic or predicate comparison on an incompatible pair.
    #[error("type mismatch in '{where_}': expected {expected}, got {got}")]
    TypeMismatch {
        expected: String,
        got: String,
        where_: String,
    },

    /// Division by zero, invalid `pow`, etc.
    #[error("arithmetic error in '{formula_id}': {message}")]
    ArithmeticError { formula_id: String, message: String },

    /// Tokenizer or parser failure, with the character offset of the fault.
    #[error("expression error at offset {offset}: {message}")]
    ExpressionError { offset: usize, message: String },

    /// A scoring tree exhausted its branches with no default.
    #[error("no matching branch for scoring formula '{0}'")]
    NoMatch(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Json(e.to_string())
    }
}

/// Find the closest candidate name to `target` among `available`, for
/// "did you mean?" diagnostics. Grounded on the teacher's
/// `FormulaErrorContext::find_similar` (exact, then prefix, then substring).
pub fn find_similar<'a>(target: &str, available: &'a [String]) -> Option<&'a str> {
    let target_lower = target.to_lowercase();

    for name in available {
        if name.to_lowercase() == target_lower {
            return Some(name);
        }
    }
    for name in available {
        let lower = name.to_lowercase();
        if lower.starts_with(&target_lower) || target_lower.starts_with(&lower) {
            return Some(name);
        }
    }
    for name in available {
        let lower = name.to_lowercase();
        if lower.contains(&target_lower) || target_lower.contains(&lower) {
            return Some(name);
        }
    }
    None
}

//! Error types for the rule engine.

use thiserror::Error;

/// Errors raised while registering or querying rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// Malformed clause, term, or condition text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Structurally valid input that cannot be accepted (unknown goal,
    /// condition without identifiers, bad measurement).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A condition failed to evaluate against the current measurements.
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// Closed set of failures when evaluating a trigger condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("operator `{operator}` expects {expected}")]
    TypeMismatch {
        operator: &'static str,
        expected: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,
}

impl From<edgekb_core::CoreError> for RuleError {
    fn from(e: edgekb_core::CoreError) -> Self {
        match e {
            edgekb_core::CoreError::Validation(msg) => Self::Validation(msg),
        }
    }
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

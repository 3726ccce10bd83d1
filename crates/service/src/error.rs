use edgekb_core::CoreError;
use edgekb_rules::RuleError;
use thiserror::Error;

/// Why a command was rejected or failed. Reported to the caller with
/// `return_code = -1`; never fatal to the engine loop.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("engine is not running")]
    EngineClosed,
}

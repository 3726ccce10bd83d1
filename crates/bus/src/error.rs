use thiserror::Error;

/// Errors that can occur in the knowledge-base messaging layer.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("transport error: {0}")]
    Transport(String),

    /// A peer sent a message without the expected frames.
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl BusError {
    /// True when the error concerns one message, not the socket: the
    /// request can be answered and the channel keeps serving.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, BusError::Json(_) | BusError::Malformed(_))
    }
}

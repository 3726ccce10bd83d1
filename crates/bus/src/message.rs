use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// A topic plus one JSON document.
///
/// On PUB/SUB sockets this is two frames: the topic (used by SUB sockets
/// for prefix filtering) and the JSON payload bytes. PUSH sockets send the
/// payload alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Message {
    /// Create a new message, serializing the payload as JSON.
    pub fn new<T: Serialize>(topic: impl Into<String>, payload: &T) -> Result<Self, BusError> {
        Ok(Self {
            topic: topic.into(),
            payload: serde_json::to_vec(payload)?,
        })
    }

    /// Wrap already-encoded payload bytes.
    pub fn raw(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Deserialize the payload into the expected type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, BusError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

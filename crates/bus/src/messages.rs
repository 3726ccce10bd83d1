//! JSON documents exchanged on the command, event and telemetry channels.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Return code for a command that succeeded.
pub const RETURN_OK: i32 = 0;
/// Return code for a command that failed.
pub const RETURN_ERROR: i32 = -1;

/// A request on the command channel: `{"command": "rule", "args": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// Reply to a [`CommandRequest`]. Echoes the request and adds the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
    pub return_code: i32,
    pub result: Value,
}

impl CommandResponse {
    pub fn ok(command: impl Into<String>, args: Vec<Value>, result: Value) -> Self {
        Self {
            command: command.into(),
            args,
            return_code: RETURN_OK,
            result,
        }
    }

    pub fn error(command: impl Into<String>, args: Vec<Value>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args,
            return_code: RETURN_ERROR,
            result: Value::String(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.return_code == RETURN_OK
    }
}

/// A plugin transition published on the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub goal_id: String,
    /// `Runnable` or `Stoppable`.
    pub status: String,
    pub plugin_name: String,
}

/// A reading on the telemetry channel. `timestamp` and `value` may be JSON
/// numbers or numeric strings, so they are kept loosely typed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub name: String,
    #[serde(default)]
    pub timestamp: Value,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_args_default_to_empty() {
        let req: CommandRequest = serde_json::from_value(json!({"command": "ping"})).unwrap();
        assert_eq!(req, CommandRequest::new("ping", vec![]));
    }

    #[test]
    fn response_wire_shape() {
        let resp = CommandResponse::ok("ask", vec![json!("g1"), json!("Run(x)")], json!(["Cloud"]));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({
                "command": "ask",
                "args": ["g1", "Run(x)"],
                "return_code": 0,
                "result": ["Cloud"],
            })
        );
        let err = CommandResponse::error("dump", vec![], "boom");
        assert_eq!(err.return_code, RETURN_ERROR);
        assert!(!err.is_ok());
    }

    #[test]
    fn telemetry_accepts_string_values() {
        let r: TelemetryReading =
            serde_json::from_value(json!({"name": "env.temp", "timestamp": 17, "value": "21.5"})).unwrap();
        assert_eq!(r.value, json!("21.5"));
    }
}

//! Scalar sensor readings as they enter the knowledge base.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// A single named numeric reading.
///
/// `timestamp` is nanoseconds since the Unix epoch as reported by the
/// producer; the knowledge base keeps it only for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub timestamp: i64,
    pub value: f64,
}

impl Measurement {
    /// Build a measurement from loosely typed JSON parts.
    ///
    /// Both `timestamp` and `value` may arrive as JSON numbers or as numeric
    /// strings. Anything else, and any non-finite value, is rejected.
    pub fn from_json_parts(name: &Value, timestamp: &Value, value: &Value) -> Result<Self, CoreError> {
        let name = match name {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            other => {
                return Err(CoreError::Validation(format!(
                    "measurement name must be a non-empty string, got {other}"
                )))
            }
        };
        let timestamp = parse_timestamp(timestamp).ok_or_else(|| {
            CoreError::Validation(format!("measurement {name}: invalid timestamp {timestamp}"))
        })?;
        let value = parse_numeric(value).ok_or_else(|| {
            CoreError::Validation(format!("measurement {name}: non-numeric value {value}"))
        })?;
        Ok(Self { name, timestamp, value })
    }

    /// The identifier this measurement is stored and referenced under.
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }
}

/// Replace every character that cannot appear in an identifier with `_`.
///
/// `env.temperature` becomes `env_temperature`. The mapping is lossy:
/// `env.temp` and `env-temp` collapse to the same identifier.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Interpret a JSON number or numeric string as a finite `f64`.
pub fn parse_numeric(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn parse_timestamp(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

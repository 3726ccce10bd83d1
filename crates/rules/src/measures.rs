//! Latest-value measurement snapshot.

use std::collections::HashMap;

use edgekb_core::{CoreError, Measurement};
use tracing::warn;

/// Latest value per sanitized measurement name. No history is kept.
#[derive(Debug, Default, Clone)]
pub struct MeasureStore {
    values: HashMap<String, f64>,
    /// Sanitized name -> external name it was last written under.
    sources: HashMap<String, String>,
}

impl MeasureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value for `m`'s sanitized name and return that name.
    pub fn ingest(&mut self, m: &Measurement) -> Result<String, CoreError> {
        if !m.value.is_finite() {
            return Err(CoreError::Validation(format!(
                "measurement {}: value {} is not finite",
                m.name, m.value
            )));
        }
        let key = m.sanitized_name();
        if key.is_empty() {
            return Err(CoreError::Validation("measurement name is empty".into()));
        }
        if let Some(previous) = self.sources.get(&key) {
            if previous != &m.name {
                warn!(
                    identifier = %key,
                    previous = %previous,
                    current = %m.name,
                    "measurement names collide after sanitization, last write wins"
                );
            }
        }
        self.values.insert(key.clone(), m.value);
        self.sources.insert(key.clone(), m.name.clone());
        Ok(key)
    }

    pub fn get(&self, sanitized: &str) -> Option<f64> {
        self.values.get(sanitized).copied()
    }

    pub fn values(&self) -> &HashMap<String, f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

use crate::error::BusError;
use crate::transport::Transport;

use super::types::BusConfig;

impl BusConfig {
    /// Validate the config: endpoints parse, bound sockets do not collide,
    /// at least one telemetry topic, non-zero client timeout.
    pub fn validate(&self) -> Result<(), BusError> {
        self.validate_endpoints()?;
        self.validate_telemetry()?;
        if self.client.timeout_secs == 0 {
            return Err(BusError::Config("client.timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    fn validate_endpoints(&self) -> Result<(), BusError> {
        let command = Transport::parse(&self.endpoints.command)?;
        let event = Transport::parse(&self.endpoints.event)?;
        Transport::parse(&self.endpoints.telemetry)?;
        if command == event {
            return Err(BusError::Config(format!(
                "command and event endpoints must differ (both {command})"
            )));
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<(), BusError> {
        if self.telemetry.topics.is_empty() {
            return Err(BusError::Config(
                "telemetry.topics must list at least one prefix (use \"\" for all)".into(),
            ));
        }
        Ok(())
    }
}

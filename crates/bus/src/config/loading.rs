use std::path::Path;
use std::time::Duration;

use crate::error::BusError;
use crate::transport::Transport;

use super::types::{BusConfig, ClientConfig, EndpointsConfig, TelemetryConfig};

impl BusConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, BusError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Single-node config using IPC sockets under `/tmp/edgekb/`.
    pub fn local() -> Self {
        Self::default()
    }

    /// Config with every socket on TCP: command on `base_port`, events on
    /// `base_port + 1`, telemetry on `base_port + 2`.
    pub fn tcp(host: &str, base_port: u16) -> Self {
        Self {
            endpoints: EndpointsConfig {
                command: format!("tcp://{host}:{base_port}"),
                event: format!("tcp://{host}:{}", base_port + 1),
                telemetry: format!("tcp://{host}:{}", base_port + 2),
            },
            telemetry: TelemetryConfig::default(),
            client: ClientConfig::default(),
        }
    }

    pub fn command_transport(&self) -> Result<Transport, BusError> {
        Transport::parse(&self.endpoints.command)
    }

    pub fn event_transport(&self) -> Result<Transport, BusError> {
        Transport::parse(&self.endpoints.event)
    }

    pub fn telemetry_transport(&self) -> Result<Transport, BusError> {
        Transport::parse(&self.endpoints.telemetry)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client.timeout_secs)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `EDGEKB_BUS_KEY` overrides the matching key:
    /// - `EDGEKB_BUS_COMMAND` → `endpoints.command`
    /// - `EDGEKB_BUS_EVENT` → `endpoints.event`
    /// - `EDGEKB_BUS_TELEMETRY` → `endpoints.telemetry`
    /// - `EDGEKB_BUS_TELEMETRY_TOPICS` → `telemetry.topics` (comma separated)
    /// - `EDGEKB_BUS_CLIENT_TIMEOUT_SECS` → `client.timeout_secs`
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EDGEKB_BUS_COMMAND") {
            self.endpoints.command = v;
        }
        if let Ok(v) = std::env::var("EDGEKB_BUS_EVENT") {
            self.endpoints.event = v;
        }
        if let Ok(v) = std::env::var("EDGEKB_BUS_TELEMETRY") {
            self.endpoints.telemetry = v;
        }
        if let Ok(v) = std::env::var("EDGEKB_BUS_TELEMETRY_TOPICS") {
            self.telemetry.topics = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("EDGEKB_BUS_CLIENT_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.client.timeout_secs = secs;
            }
        }
    }
}

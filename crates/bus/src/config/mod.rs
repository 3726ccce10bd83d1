//! TOML configuration for the command, event and telemetry sockets.

mod loading;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use types::{BusConfig, ClientConfig, EndpointsConfig, TelemetryConfig};

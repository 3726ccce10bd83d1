use serde::{Deserialize, Serialize};

// ── Top-level config ────────────────────────────────────────────────

/// Socket layout of the knowledge-base service.
///
/// Parsed from `edgekb.toml` with support for environment variable overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BusConfig {
    /// Where the command, event and telemetry sockets live.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Telemetry subscription settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Defaults for [`KbClient`](crate::KbClient) callers.
    #[serde(default)]
    pub client: ClientConfig,
}

// ── Section configs ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// REP socket the service binds for commands.
    #[serde(default = "default_command")]
    pub command: String,

    /// PUSH socket the service binds for transition events.
    #[serde(default = "default_event")]
    pub event: String,

    /// Telemetry publisher the service's SUB socket connects to.
    #[serde(default = "default_telemetry")]
    pub telemetry: String,
}

fn default_command() -> String {
    "ipc:///tmp/edgekb/kb.sock".into()
}

fn default_event() -> String {
    "ipc:///tmp/edgekb/event.sock".into()
}

fn default_telemetry() -> String {
    "ipc:///tmp/edgekb/telemetry.sock".into()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            event: default_event(),
            telemetry: default_telemetry(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Topic prefixes to subscribe to. An empty string matches everything.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
}

fn default_topics() -> Vec<String> {
    vec![crate::topics::TELEMETRY_PREFIX.to_string()]
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
}

fn default_client_timeout() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_client_timeout(),
        }
    }
}

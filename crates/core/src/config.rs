use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

/// Process-level settings for the knowledge-base service.
///
/// Socket endpoints live in the bus TOML file referenced by `bus_config`;
/// this struct only carries what the launcher needs before the bus is up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Path to the bus TOML file (endpoints, telemetry topics, client timeout).
    pub bus_config: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Bound of the command queue shared by both ingress tasks.
    pub queue_capacity: usize,
}

impl KbConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `EDGEKB_PROFILE`. When set (e.g. `NODE`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("EDGEKB_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            bus_config: PathBuf::from(profiled_env_or(p, "BUS_CONFIG", "config/edgekb.toml")),
            log_filter: profiled_env_or(p, "LOG_FILTER", "info"),
            queue_capacity: profiled_env_usize(p, "QUEUE_CAPACITY", 1024).max(1),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  bus_config:     {}", self.bus_config.display());
        tracing::info!("  log_filter:     {}", self.log_filter);
        tracing::info!("  queue_capacity: {}", self.queue_capacity);
    }
}

impl Default for KbConfig {
    fn default() -> Self {
        Self::for_profile("")
    }
}

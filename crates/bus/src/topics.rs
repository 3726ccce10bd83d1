//! Topic names for telemetry routing and event log labels.

/// Prefix of every transition event topic.
pub const EVENT_PREFIX: &str = "kb.event.";

/// Topic for a `Runnable` transition.
pub const EVENT_RUNNABLE: &str = "kb.event.Runnable";

/// Topic for a `Stoppable` transition.
pub const EVENT_STOPPABLE: &str = "kb.event.Stoppable";

/// Default telemetry subscription prefix.
pub const TELEMETRY_PREFIX: &str = "env.";

/// Event topic for a transition status.
pub fn event_topic(status: &str) -> String {
    format!("{EVENT_PREFIX}{status}")
}

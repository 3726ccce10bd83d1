//! The knowledge-base service: decodes commands, runs the single-writer
//! engine loop and publishes plugin transitions.

pub mod command;
pub mod engine;
pub mod error;
pub mod ingress;
pub mod service;

pub use command::Command;
pub use engine::{Engine, Envelope, Reply};
pub use error::CommandError;
pub use ingress::{command_ingress, telemetry_ingress};
pub use service::KbService;

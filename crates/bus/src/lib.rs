//! ZeroMQ plumbing for the knowledge-base service.
//!
//! Three channels, each frame carrying one JSON document:
//! - command: REQ/REP, [`ZmqCommandServer`] and [`KbClient`]
//! - events: PUSH/PULL, one JSON frame per event, [`ZmqPusher`] and
//!   [`ZmqPuller`]
//! - telemetry: PUB/SUB `[topic, json]`, [`ZmqSubscriber`] in the service
//!   and [`ZmqPublisher`] for producers

pub mod config;
pub mod error;
pub mod message;
pub mod messages;
pub mod pubsub;
pub mod pushpull;
pub mod reqrep;
pub mod topics;
pub mod traits;
pub mod transport;

pub use config::BusConfig;
pub use error::BusError;
pub use message::Message;
pub use messages::{CommandRequest, CommandResponse, StatusEvent, TelemetryReading};
pub use pubsub::{ZmqPublisher, ZmqSubscriber};
pub use pushpull::{ZmqPuller, ZmqPusher, EVENT_BACKLOG};
pub use reqrep::{KbClient, ZmqCommandServer};
pub use traits::{EventPublisher, EventSubscriber, RequestHandler, RequestSender};
pub use transport::Transport;

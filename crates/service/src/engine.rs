//! The single owner of the knowledge base.
//!
//! Both ingress tasks feed one bounded queue; the engine applies commands
//! strictly in arrival order and publishes transitions before it replies.

use std::time::Duration;

use edgekb_bus::topics::event_topic;
use edgekb_bus::{EventPublisher, Message, StatusEvent};
use edgekb_rules::{KnowledgeBase, Transition};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::command::Command;
use crate::error::CommandError;

/// How often events the publisher held back are retried while idle.
const FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome handed back to the command ingress.
pub type Reply = Result<Value, CommandError>;

/// A queued command. Telemetry readings carry no reply channel.
#[derive(Debug)]
pub struct Envelope {
    pub command: Command,
    pub reply: Option<oneshot::Sender<Reply>>,
}

impl Envelope {
    pub fn request(command: Command) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                reply: Some(tx),
            },
            rx,
        )
    }

    pub fn fire_and_forget(command: Command) -> Self {
        Self {
            command,
            reply: None,
        }
    }
}

pub struct Engine<P: EventPublisher> {
    kb: KnowledgeBase,
    publisher: P,
}

impl<P: EventPublisher> Engine<P> {
    pub fn new(publisher: P) -> Self {
        Self::with_knowledge_base(KnowledgeBase::new(), publisher)
    }

    pub fn with_knowledge_base(kb: KnowledgeBase, publisher: P) -> Self {
        Self { kb, publisher }
    }

    /// Drain the queue until `terminate` or until every sender is gone.
    /// Between commands, undelivered events are retried every
    /// [`FLUSH_INTERVAL`]. Returns the final knowledge base.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut queue: mpsc::Receiver<Envelope>) -> KnowledgeBase {
        info!("engine started");
        let mut retry = tokio::time::interval(FLUSH_INTERVAL);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let Envelope { command, reply } = tokio::select! {
                next = queue.recv() => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
                _ = retry.tick() => {
                    self.flush().await;
                    continue;
                }
            };
            let terminate = command == Command::Terminate;
            let kind = command.kind();
            let outcome = self.apply(command).await;
            if let Err(e) = &outcome {
                warn!(command = kind, error = %e, "command failed");
            }
            if let Some(reply) = reply {
                // The requester may have given up; nothing to do then.
                let _ = reply.send(outcome);
            }
            if terminate {
                info!("terminate received, engine stopping");
                break;
            }
        }
        self.flush().await;
        info!(goals = self.kb.goal_ids().count(), "engine stopped");
        self.kb
    }

    /// Apply one command to the knowledge base.
    pub async fn apply(&mut self, command: Command) -> Reply {
        match command {
            Command::Rule { goal_id, rules } => {
                let n = self.kb.register_rules(&goal_id, &rules)?;
                debug!(goal_id = %goal_id, added = n, "rules registered");
                Ok(json!("ok"))
            }
            Command::Trigger {
                goal_id,
                expressions,
            } => {
                let n = self.kb.register_triggers(&goal_id, &expressions)?;
                debug!(goal_id = %goal_id, added = n, "triggers registered");
                Ok(json!("ok"))
            }
            Command::Dump { goal_id } => {
                self.kb.dump(&goal_id)?;
                Ok(json!("ok"))
            }
            Command::Ask { goal_id, predicate } => {
                let values = self.kb.ask(&goal_id, &predicate)?;
                Ok(Value::from(values))
            }
            Command::Measure(measurement) => {
                let transitions = self.kb.on_measurement(&measurement)?;
                self.publish(&transitions).await;
                Ok(json!("ok"))
            }
            Command::Ping => Ok(json!("pong")),
            Command::Terminate => Ok(json!("terminating")),
        }
    }

    /// Publish transitions in order. A failed publish is logged, never fatal.
    async fn publish(&self, transitions: &[Transition]) {
        for t in transitions {
            let event = StatusEvent {
                goal_id: t.goal_id.clone(),
                status: t.status.as_str().to_string(),
                plugin_name: t.plugin_name.clone(),
            };
            let message = match Message::new(event_topic(&event.status), &event) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "failed to serialize status event");
                    continue;
                }
            };
            if let Err(e) = self.publisher.publish(message).await {
                warn!(goal_id = %event.goal_id, plugin = %event.plugin_name, error = %e, "failed to publish status event");
            }
        }
    }

    async fn flush(&self) {
        if let Err(e) = self.publisher.flush().await {
            debug!(error = %e, "events still waiting for a consumer");
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }
}

//! Producers for the engine queue: the command channel and telemetry.

use std::sync::Arc;
use std::time::Duration;

use edgekb_bus::{BusError, CommandRequest, CommandResponse, EventSubscriber, RequestHandler};
use edgekb_core::Measurement;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::engine::{Envelope, Reply};
use crate::error::CommandError;

const RECV_BACKOFF: Duration = Duration::from_millis(100);

/// Serve the command channel until `terminate` has been answered, the
/// engine is gone, or `shutdown` fires.
///
/// Every received request gets exactly one reply. Requests that fail to
/// decode are answered here and never reach the engine.
pub async fn command_ingress<H>(
    handler: H,
    queue: mpsc::Sender<Envelope>,
    shutdown: Arc<Notify>,
) -> Result<(), BusError>
where
    H: RequestHandler + 'static,
{
    info!("command ingress started");
    loop {
        let raw = tokio::select! {
            r = handler.recv_request() => r,
            _ = shutdown.notified() => {
                info!("command ingress stopping");
                return Ok(());
            }
        };

        let raw = match raw {
            Ok(v) => v,
            Err(e) if e.is_malformed_message() => {
                warn!(error = %e, "undecodable request");
                handler
                    .send_reply(&CommandResponse::error("", vec![], e.to_string()))
                    .await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let request: CommandRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "malformed request");
                handler
                    .send_reply(&CommandResponse::error("", vec![], format!("malformed request: {e}")))
                    .await?;
                continue;
            }
        };

        let command = match Command::decode(&request) {
            Ok(c) => c,
            Err(e) => {
                warn!(command = %request.command, error = %e, "rejected request");
                handler.send_reply(&respond(&request, Err(e))).await?;
                continue;
            }
        };
        debug!(command = command.kind(), "request");

        if command == Command::Ping {
            handler.send_reply(&respond(&request, Ok(json!("pong")))).await?;
            continue;
        }

        let terminate = command == Command::Terminate;
        let (envelope, reply_rx) = Envelope::request(command);
        if queue.send(envelope).await.is_err() {
            handler
                .send_reply(&respond(&request, Err(CommandError::EngineClosed)))
                .await?;
            return Ok(());
        }
        let outcome = reply_rx.await.unwrap_or(Err(CommandError::EngineClosed));
        handler.send_reply(&respond(&request, outcome)).await?;

        if terminate {
            info!("terminate answered, command ingress stopping");
            return Ok(());
        }
    }
}

/// Turn subscribed telemetry into `measure` commands until `shutdown`
/// fires or the engine is gone. Bad readings are logged and skipped.
pub async fn telemetry_ingress<S>(
    subscriber: S,
    topics: Vec<String>,
    queue: mpsc::Sender<Envelope>,
    shutdown: Arc<Notify>,
) -> Result<(), BusError>
where
    S: EventSubscriber + 'static,
{
    for topic in &topics {
        subscriber.subscribe(topic).await?;
    }
    info!(topics = ?topics, "telemetry ingress started");

    loop {
        let message = tokio::select! {
            m = subscriber.recv() => m,
            _ = shutdown.notified() => {
                info!("telemetry ingress stopping");
                return Ok(());
            }
        };
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "telemetry receive failed");
                tokio::time::sleep(RECV_BACKOFF).await;
                continue;
            }
        };

        let measurement = match message
            .decode::<edgekb_bus::TelemetryReading>()
            .map_err(|e| e.to_string())
            .and_then(|r| reading_to_measurement(&r).map_err(|e| e.to_string()))
        {
            Ok(m) => m,
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "dropping telemetry");
                continue;
            }
        };

        if queue
            .send(Envelope::fire_and_forget(Command::Measure(measurement)))
            .await
            .is_err()
        {
            info!("engine gone, telemetry ingress stopping");
            return Ok(());
        }
    }
}

fn reading_to_measurement(
    reading: &edgekb_bus::TelemetryReading,
) -> Result<Measurement, edgekb_core::CoreError> {
    // Producers may omit the timestamp; it is only kept for logging.
    let timestamp = match &reading.timestamp {
        Value::Null => json!(0),
        other => other.clone(),
    };
    Measurement::from_json_parts(&Value::String(reading.name.clone()), &timestamp, &reading.value)
}

/// Build the reply for `request`, echoing its command and arguments.
pub fn respond(request: &CommandRequest, outcome: Reply) -> CommandResponse {
    match outcome {
        Ok(result) => CommandResponse::ok(request.command.clone(), request.args.clone(), result),
        Err(e) => CommandResponse::error(request.command.clone(), request.args.clone(), e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use edgekb_bus::Message;
    use tokio::sync::Mutex;

    /// Hands out queued requests, then fails like a closed socket.
    #[derive(Default)]
    struct MockHandler {
        requests: Mutex<VecDeque<Result<Value, BusError>>>,
        replies: Mutex<Vec<CommandResponse>>,
    }

    impl MockHandler {
        fn with(requests: Vec<Result<Value, BusError>>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(requests.into()),
                replies: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl RequestHandler for MockHandler {
        async fn recv_request(&self) -> Result<Value, BusError> {
            self.requests
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(BusError::Transport("closed".into())))
        }

        async fn send_reply(&self, reply: &CommandResponse) -> Result<(), BusError> {
            self.replies.lock().await.push(reply.clone());
            Ok(())
        }
    }

    struct MockSubscriber {
        messages: Mutex<VecDeque<Message>>,
    }

    #[async_trait]
    impl EventSubscriber for MockSubscriber {
        async fn subscribe(&self, _topic_prefix: &str) -> Result<(), BusError> {
            Ok(())
        }

        async fn recv(&self) -> Result<Message, BusError> {
            let next = self.messages.lock().await.pop_front();
            match next {
                Some(m) => Ok(m),
                None => std::future::pending().await,
            }
        }
    }

    fn json_error() -> BusError {
        BusError::Json(serde_json::from_str::<Value>("{").unwrap_err())
    }

    #[tokio::test]
    async fn rejected_requests_never_reach_the_engine() {
        let handler = MockHandler::with(vec![
            Ok(json!({"command": "launch", "args": []})),
            Ok(json!({"command": "rule", "args": ["g1"]})),
            Ok(json!({"args": []})),
            Err(json_error()),
            Err(BusError::Malformed("empty request/reply message".into())),
            Ok(json!({"command": "ping"})),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        let result = command_ingress(handler.clone(), tx, Arc::new(Notify::new())).await;
        assert!(matches!(result, Err(BusError::Transport(_))));
        assert!(rx.try_recv().is_err(), "nothing should be enqueued");

        let replies = handler.replies.lock().await;
        assert_eq!(replies.len(), 6);
        assert!(replies[..5].iter().all(|r| r.return_code == -1));
        assert_eq!(replies[0].command, "launch");
        assert_eq!(replies[5].result, json!("pong"));
        assert!(replies[5].is_ok());
    }

    #[tokio::test]
    async fn forwards_to_engine_and_stops_after_terminate() {
        let handler = MockHandler::with(vec![
            Ok(json!({"command": "dump", "args": ["g1"]})),
            Ok(json!({"command": "terminate"})),
            Ok(json!({"command": "ping"})),
        ]);
        let (tx, mut rx) = mpsc::channel::<Envelope>(8);
        let engine = tokio::spawn(async move {
            while let Some(env) = rx.recv().await {
                let result = match env.command {
                    Command::Terminate => json!("terminating"),
                    _ => json!("ok"),
                };
                if let Some(reply) = env.reply {
                    let _ = reply.send(Ok(result));
                }
            }
        });

        command_ingress(handler.clone(), tx, Arc::new(Notify::new()))
            .await
            .unwrap();
        engine.await.unwrap();

        let replies = handler.replies.lock().await;
        assert_eq!(replies.len(), 2, "ping after terminate is not served");
        assert_eq!(replies[0].args, vec![json!("g1")]);
        assert_eq!(replies[1].result, json!("terminating"));
    }

    #[tokio::test]
    async fn closed_engine_is_reported() {
        let handler = MockHandler::with(vec![Ok(json!({"command": "dump", "args": ["g1"]}))]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        command_ingress(handler.clone(), tx, Arc::new(Notify::new()))
            .await
            .unwrap();
        let replies = handler.replies.lock().await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].return_code, -1);
    }

    #[tokio::test]
    async fn telemetry_becomes_measure_commands() {
        let subscriber = MockSubscriber {
            messages: Mutex::new(
                vec![
                    Message::new("env.bad", &json!({"name": "env.bad", "value": "n/a"})).unwrap(),
                    Message::raw("env.garbage", b"nope".to_vec()),
                    Message::new(
                        "env.system.time",
                        &json!({"name": "env.system.time", "timestamp": "17", "value": "11"}),
                    )
                    .unwrap(),
                    Message::new("env.temp", &json!({"name": "env.temp", "value": 21.5})).unwrap(),
                ]
                .into(),
            ),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(telemetry_ingress(
            subscriber,
            vec!["env.".into()],
            tx,
            shutdown.clone(),
        ));

        let first = rx.recv().await.unwrap();
        assert!(first.reply.is_none());
        assert_eq!(
            first.command,
            Command::Measure(Measurement {
                name: "env.system.time".into(),
                timestamp: 17,
                value: 11.0,
            })
        );
        match rx.recv().await.unwrap().command {
            Command::Measure(m) => {
                assert_eq!(m.timestamp, 0);
                assert_eq!(m.value, 21.5);
            }
            other => panic!("expected measure, got {other:?}"),
        }

        shutdown.notify_one();
        task.await.unwrap().unwrap();
    }
}

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use zeromq::prelude::*;
use zeromq::{PubSocket, SubSocket, ZmqMessage};

use crate::error::BusError;
use crate::message::Message;
use crate::traits::{EventPublisher, EventSubscriber};
use crate::transport::Transport;

/// ZeroMQ PUB socket, the producer side of a telemetry feed.
///
/// Messages are sent as two-frame ZMQ messages:
/// 1. Topic string (used by SUB sockets for prefix filtering)
/// 2. JSON payload
pub struct ZmqPublisher {
    socket: Mutex<PubSocket>,
}

impl ZmqPublisher {
    /// Bind a PUB socket; subscribers connect to it.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, BusError> {
        transport.prepare_bind()?;
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding PUB socket");
        socket.bind(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Connect a PUB socket to a bound SUB socket (producer side of a
    /// telemetry feed whose consumer binds).
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting PUB socket");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl EventPublisher for ZmqPublisher {
    /// Publish a message as a two-frame ZMQ message: [topic, payload].
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        let mut zmq_msg = ZmqMessage::from(message.topic.as_str());
        zmq_msg.push_back(message.payload.into());

        let mut socket = self.socket.lock().await;
        socket.send(zmq_msg).await?;

        debug!(topic = %message.topic, "published message");
        Ok(())
    }
}

/// ZeroMQ SUB socket used for the telemetry channel.
pub struct ZmqSubscriber {
    socket: Mutex<SubSocket>,
}

impl ZmqSubscriber {
    /// Connect a SUB socket to a bound publisher.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = SubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting SUB socket");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl EventSubscriber for ZmqSubscriber {
    /// Subscribe to messages with topics matching the given prefix.
    ///
    /// An empty string subscribes to all topics.
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError> {
        let mut socket = self.socket.lock().await;
        socket.subscribe(topic_prefix).await?;
        info!(topic_prefix = %topic_prefix, "subscribed to topic prefix");
        Ok(())
    }

    /// Receive the next message matching a subscription.
    ///
    /// Expects `[topic, payload]`. A single frame is accepted as
    /// `"<topic> <json>"`, the framing plain ZeroMQ producers often use.
    async fn recv(&self) -> Result<Message, BusError> {
        let mut socket = self.socket.lock().await;
        let zmq_msg = socket.recv().await?;
        let frames: Vec<_> = zmq_msg.iter().collect();

        let message = match frames.as_slice() {
            [topic, payload, ..] => Message::raw(
                String::from_utf8_lossy(topic.as_ref()).into_owned(),
                payload.to_vec(),
            ),
            [single] => split_single_frame(single.as_ref()),
            [] => return Err(BusError::Malformed("empty ZMQ message".into())),
        };
        debug!(topic = %message.topic, "received message");
        Ok(message)
    }
}

fn split_single_frame(frame: &[u8]) -> Message {
    match frame.iter().position(|b| b.is_ascii_whitespace()) {
        Some(i) if frame.first() != Some(&b'{') => Message::raw(
            String::from_utf8_lossy(&frame[..i]).into_owned(),
            frame[i + 1..].to_vec(),
        ),
        _ => Message::raw(String::new(), frame.to_vec()),
    }
}

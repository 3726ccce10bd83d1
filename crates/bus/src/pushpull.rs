//! One-way event channel over ZeroMQ PUSH/PULL sockets.
//!
//! Every message is a single frame holding one JSON document. A PUSH
//! socket refuses to send while no consumer is connected, so
//! [`ZmqPusher`] keeps unsent documents in a bounded backlog and delivers
//! them, oldest first, once a consumer shows up.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use zeromq::prelude::*;
use zeromq::{PullSocket, PushSocket, ZmqMessage};

use crate::error::BusError;
use crate::message::Message;
use crate::traits::EventPublisher;
use crate::transport::Transport;

/// Default number of undelivered events kept for a late consumer.
pub const EVENT_BACKLOG: usize = 1024;

/// Upper bound on one send, so a consumer that stops reading cannot stall
/// the caller.
const SEND_TIMEOUT: Duration = Duration::from_millis(250);

struct Outbox {
    socket: PushSocket,
    backlog: VecDeque<Vec<u8>>,
}

/// ZeroMQ PUSH socket used for the event channel.
///
/// The message topic is not sent; it only labels log lines.
pub struct ZmqPusher {
    outbox: Mutex<Outbox>,
    capacity: usize,
}

impl ZmqPusher {
    /// Bind a PUSH socket; the event consumer connects to it.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, BusError> {
        transport.prepare_bind()?;
        let mut socket = PushSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding PUSH socket");
        socket.bind(&endpoint).await?;
        Ok(Self::from_socket(socket))
    }

    /// Connect a PUSH socket to a bound PULL socket.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = PushSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting PUSH socket");
        socket.connect(&endpoint).await?;
        Ok(Self::from_socket(socket))
    }

    fn from_socket(socket: PushSocket) -> Self {
        Self {
            outbox: Mutex::new(Outbox {
                socket,
                backlog: VecDeque::new(),
            }),
            capacity: EVENT_BACKLOG,
        }
    }

    /// Keep at most `capacity` undelivered events (at least one).
    pub fn with_backlog(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Number of events still waiting for a consumer.
    pub async fn pending(&self) -> usize {
        self.outbox.lock().await.backlog.len()
    }
}

/// Send queued documents in order. Stops at the first failure and leaves
/// that document at the head of the backlog.
async fn drain(outbox: &mut Outbox) -> Result<(), BusError> {
    while let Some(front) = outbox.backlog.front() {
        let frame = ZmqMessage::from(front.clone());
        match tokio::time::timeout(SEND_TIMEOUT, outbox.socket.send(frame)).await {
            Ok(Ok(())) => {
                outbox.backlog.pop_front();
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(BusError::Timeout(SEND_TIMEOUT)),
        }
    }
    Ok(())
}

#[async_trait]
impl EventPublisher for ZmqPusher {
    /// Queue the payload and send everything that can be sent. An event
    /// that finds no consumer stays queued and is not an error.
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        let mut outbox = self.outbox.lock().await;
        if outbox.backlog.len() >= self.capacity {
            outbox.backlog.pop_front();
            warn!(capacity = self.capacity, "event backlog full, dropped oldest event");
        }
        outbox.backlog.push_back(message.payload);

        match drain(&mut outbox).await {
            Ok(()) => debug!(topic = %message.topic, "pushed event"),
            Err(e) => debug!(
                topic = %message.topic,
                pending = outbox.backlog.len(),
                error = %e,
                "event queued until a consumer connects"
            ),
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), BusError> {
        let mut outbox = self.outbox.lock().await;
        if outbox.backlog.is_empty() {
            return Ok(());
        }
        let before = outbox.backlog.len();
        let result = drain(&mut outbox).await;
        let sent = before - outbox.backlog.len();
        if sent > 0 {
            info!(sent, pending = outbox.backlog.len(), "delivered queued events");
        }
        result
    }
}

/// ZeroMQ PULL socket, the consumer side of the event channel.
pub struct ZmqPuller {
    socket: Mutex<PullSocket>,
}

impl ZmqPuller {
    /// Connect a PULL socket to a bound PUSH socket.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = PullSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting PULL socket");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Receive the next document as raw JSON bytes.
    pub async fn recv(&self) -> Result<Vec<u8>, BusError> {
        let mut socket = self.socket.lock().await;
        let zmq_msg = socket.recv().await?;
        zmq_msg
            .iter()
            .map(|f| f.to_vec())
            .find(|f| !f.is_empty())
            .ok_or_else(|| BusError::Malformed("empty event message".into()))
    }

    /// Receive the next document and decode it.
    pub async fn recv_json<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        let bytes = self.recv().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BusError;
use crate::message::Message;
use crate::messages::{CommandRequest, CommandResponse};

/// Sends messages on a one-way channel.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a message.
    async fn publish(&self, message: Message) -> Result<(), BusError>;

    /// Retry messages an earlier `publish` could not deliver. Publishers
    /// that never hold messages back have nothing to do.
    async fn flush(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// Blanket implementation so `Arc<dyn EventPublisher>` can be used directly.
#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        (**self).publish(message).await
    }

    async fn flush(&self) -> Result<(), BusError> {
        (**self).flush().await
    }
}

/// Subscribes to messages matching topic prefixes via the PUB/SUB pattern.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to messages with topics matching the given prefix.
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError>;

    /// Receive the next message. Blocks until a message is available.
    async fn recv(&self) -> Result<Message, BusError>;
}

#[async_trait]
impl<T: EventSubscriber + ?Sized> EventSubscriber for Arc<T> {
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError> {
        (**self).subscribe(topic_prefix).await
    }

    async fn recv(&self) -> Result<Message, BusError> {
        (**self).recv().await
    }
}

/// Server side of the strict request/reply command channel.
///
/// Every successful [`recv_request`](Self::recv_request) must be followed by
/// exactly one [`send_reply`](Self::send_reply), also when the request could
/// not be decoded.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Receive the next request as raw JSON. A request without a body
    /// yields [`BusError::Malformed`] and one that is not valid JSON
    /// yields [`BusError::Json`]; the caller still owes a reply for both.
    async fn recv_request(&self) -> Result<Value, BusError>;

    /// Reply to the request received last.
    async fn send_reply(&self, reply: &CommandResponse) -> Result<(), BusError>;
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Arc<T> {
    async fn recv_request(&self) -> Result<Value, BusError> {
        (**self).recv_request().await
    }

    async fn send_reply(&self, reply: &CommandResponse) -> Result<(), BusError> {
        (**self).send_reply(reply).await
    }
}

/// Client side of the command channel.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Send a request and wait for its reply, at most `timeout`.
    async fn request(
        &self,
        request: &CommandRequest,
        timeout: Duration,
    ) -> Result<CommandResponse, BusError>;
}

//! Request/reply command channel over ZeroMQ REQ/REP sockets.
//!
//! - [`ZmqCommandServer`] wraps a REP socket: strictly alternating
//!   receive-request / send-reply, one request in flight at a time
//! - [`KbClient`] wraps a REQ socket for callers of the knowledge base
//!
//! Each request and reply is a single frame holding one JSON document.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use zeromq::prelude::*;
use zeromq::{RepSocket, ReqSocket, ZmqMessage};

use crate::error::BusError;
use crate::messages::{CommandRequest, CommandResponse};
use crate::traits::{RequestHandler, RequestSender};
use crate::transport::Transport;

fn single_frame(msg: &ZmqMessage) -> Result<&[u8], BusError> {
    // REQ/REP may leave an empty delimiter in front of the body.
    msg.iter()
        .map(|f| f.as_ref())
        .find(|f: &&[u8]| !f.is_empty())
        .ok_or_else(|| BusError::Malformed("empty request/reply message".into()))
}

/// ZeroMQ REP-socket server for the command channel.
pub struct ZmqCommandServer {
    socket: Mutex<RepSocket>,
}

impl ZmqCommandServer {
    /// Bind a REP socket on the given transport endpoint.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, BusError> {
        transport.prepare_bind()?;
        let mut socket = RepSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding REP socket");
        socket.bind(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl RequestHandler for ZmqCommandServer {
    async fn recv_request(&self) -> Result<Value, BusError> {
        let mut socket = self.socket.lock().await;
        let zmq_msg = socket.recv().await?;
        let body = single_frame(&zmq_msg)?;
        let value: Value = serde_json::from_slice(body)?;
        debug!(command = ?value.get("command"), "received request");
        Ok(value)
    }

    async fn send_reply(&self, reply: &CommandResponse) -> Result<(), BusError> {
        let bytes = serde_json::to_vec(reply)?;
        let mut socket = self.socket.lock().await;
        socket.send(ZmqMessage::from(bytes)).await?;
        debug!(command = %reply.command, return_code = reply.return_code, "sent reply");
        Ok(())
    }
}

/// REQ-socket client for the command channel.
///
/// Requests are serialized: a second caller waits until the first reply
/// arrives. After a timeout the socket is replaced, since a REQ socket
/// cannot send again before it has received.
pub struct KbClient {
    transport: Transport,
    socket: Mutex<ReqSocket>,
    timeout: Duration,
}

impl KbClient {
    /// Connect a REQ socket to the knowledge base's command endpoint.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport, timeout: Duration) -> Result<Self, BusError> {
        let socket = Self::open(transport).await?;
        Ok(Self {
            transport: transport.clone(),
            socket: Mutex::new(socket),
            timeout,
        })
    }

    async fn open(transport: &Transport) -> Result<ReqSocket, BusError> {
        let mut socket = ReqSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting REQ socket");
        socket.connect(&endpoint).await?;
        Ok(socket)
    }

    /// Send a request with the client's default timeout.
    pub async fn send(&self, request: &CommandRequest) -> Result<CommandResponse, BusError> {
        self.request(request, self.timeout).await
    }

    /// Convenience wrapper for `{"command": <name>, "args": [...]}`.
    pub async fn command(
        &self,
        command: &str,
        args: Vec<Value>,
    ) -> Result<CommandResponse, BusError> {
        self.send(&CommandRequest::new(command, args)).await
    }

    pub async fn ping(&self) -> Result<bool, BusError> {
        let reply = self.command("ping", Vec::new()).await?;
        Ok(reply.is_ok() && reply.result == Value::String("pong".into()))
    }
}

#[async_trait]
impl RequestSender for KbClient {
    async fn request(
        &self,
        request: &CommandRequest,
        timeout: Duration,
    ) -> Result<CommandResponse, BusError> {
        let bytes = serde_json::to_vec(request)?;
        let mut socket = self.socket.lock().await;
        socket.send(ZmqMessage::from(bytes)).await?;
        debug!(command = %request.command, "sent request");

        match tokio::time::timeout(timeout, socket.recv()).await {
            Ok(received) => {
                let zmq_msg = received?;
                Ok(serde_json::from_slice(single_frame(&zmq_msg)?)?)
            }
            Err(_) => {
                warn!(command = %request.command, ?timeout, "request timed out, reconnecting");
                *socket = Self::open(&self.transport).await?;
                Err(BusError::Timeout(timeout))
            }
        }
    }
}

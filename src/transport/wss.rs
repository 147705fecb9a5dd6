//! WebSocket control channel.
//!
//! One text frame per command out, one JSON frame per message in. Close
//! frames and end-of-stream both end the listen sequence without error.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{ChannelFactory, ControlChannel};
use crate::auth::AuthHeaders;
use crate::config::ServerConfig;
use crate::error::{Result, TechreadError};
use crate::protocol::{Command, ControlMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ChannelState {
    Idle,
    Open(Box<WsStream>),
    Closed,
}

/// Control channel over a WebSocket connection.
pub struct WssControlChannel {
    endpoint: String,
    connect_timeout: Duration,
    state: ChannelState,
}

impl WssControlChannel {
    /// Create an unconnected channel for `endpoint`
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            state: ChannelState::Idle,
        }
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Is the channel currently open
    pub fn is_open(&self) -> bool {
        matches!(self.state, ChannelState::Open(_))
    }

    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let frame = match &mut self.state {
            ChannelState::Open(ws) => read_frame(ws).await?,
            _ => return Err(TechreadError::ChannelNotOpen),
        };

        if frame.is_none() {
            tracing::debug!("Control channel closed by {}", self.endpoint);
            self.state = ChannelState::Closed;
        }
        Ok(frame)
    }
}

async fn read_frame(ws: &mut WsStream) -> Result<Option<Vec<u8>>> {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => return Ok(Some(text.into_bytes())),
            Ok(Message::Binary(data)) => return Ok(Some(data)),
            Ok(Message::Close(_)) => return Ok(None),
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {},
            Err(
                WsError::ConnectionClosed
                | WsError::AlreadyClosed
                | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake),
            ) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

#[async_trait]
impl ControlChannel for WssControlChannel {
    async fn connect(&mut self, headers: &AuthHeaders) -> Result<()> {
        if !matches!(self.state, ChannelState::Idle) {
            return Err(TechreadError::Connection(
                "A control channel cannot be reused; create a new one".to_string(),
            ));
        }

        let mut request = self.endpoint.as_str().into_client_request()?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TechreadError::Connection(format!("Invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TechreadError::Connection(format!("Invalid header value: {e}")))?;
            request.headers_mut().insert(name, value);
        }

        tracing::debug!("Connecting control channel to {}", self.endpoint);
        let (ws, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                TechreadError::Connection(format!("Timed out connecting to {}", self.endpoint))
            })??;

        self.state = ChannelState::Open(Box::new(ws));
        Ok(())
    }

    async fn send_command(&mut self, command: &Command) -> Result<()> {
        let ChannelState::Open(ws) = &mut self.state else {
            return Err(TechreadError::ChannelNotOpen);
        };

        tracing::debug!("Sending {:?} command", command.action);
        ws.send(Message::Text(command.encode()?)).await?;
        Ok(())
    }

    async fn recv_message(&mut self) -> Result<ControlMessage> {
        match self.next_frame().await? {
            Some(raw) => ControlMessage::decode(&raw),
            None => Err(TechreadError::Connection(
                "Control channel closed before a message arrived".to_string(),
            )),
        }
    }

    async fn next_message(&mut self) -> Result<Option<ControlMessage>> {
        self.next_frame()
            .await?
            .map(|raw| ControlMessage::decode(&raw))
            .transpose()
    }

    async fn disconnect(&mut self) {
        if let ChannelState::Open(mut ws) = std::mem::replace(&mut self.state, ChannelState::Closed)
        {
            tracing::debug!("Disconnecting control channel from {}", self.endpoint);
            if let Err(e) = (*ws).close(None).await {
                tracing::debug!("Control channel close failed: {}", e);
            }
        }
    }
}

/// Builds one [`WssControlChannel`] per session from the server config.
#[derive(Debug, Clone)]
pub struct WssChannelFactory {
    endpoint: String,
    connect_timeout: Duration,
}

impl WssChannelFactory {
    /// Factory for the configured endpoint
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            endpoint: server.wss_endpoint(),
            connect_timeout: server.connect_timeout(),
        }
    }
}

impl ChannelFactory for WssChannelFactory {
    fn create(&self) -> Box<dyn ControlChannel> {
        Box::new(WssControlChannel::new(
            self.endpoint.clone(),
            self.connect_timeout,
        ))
    }
}

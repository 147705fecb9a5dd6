//! Transport layer abstraction for the techread client.
//!
//! A session talks to the service over two kinds of transport:
//! - **Control channel**: one persistent, ordered, bidirectional connection per
//!   session (WebSocket) carrying commands and result messages
//! - **Data transfer**: stateless one-shot HTTPS requests for uploading files
//!   to presigned destinations and downloading referenced payloads
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            TechreadClient                │
//! │        (session orchestration)          │
//! └──────────┬───────────────────┬──────────┘
//!            │                   │
//!            ▼                   ▼
//! ┌─────────────────────┐ ┌─────────────────┐
//! │ dyn ControlChannel  │ │ dyn DataTransfer│
//! │ (WssControlChannel) │ │  (HttpsClient)  │
//! └─────────────────────┘ └─────────────────┘
//! ```
//!
//! Both seams are traits so sessions can be driven against in-memory doubles.

mod https;
mod wss;

pub use https::{error_for_status, CallbackRequest, HttpsClient};
pub use wss::{WssChannelFactory, WssControlChannel};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};

use crate::auth::AuthHeaders;
use crate::error::Result;
use crate::protocol::{Command, ControlMessage, PresignedPost};

/// Persistent, ordered, bidirectional message channel to the service.
///
/// A channel serves exactly one session; once disconnected it cannot be
/// connected again.
#[async_trait]
pub trait ControlChannel: Send {
    /// Open the channel, presenting `headers` during the handshake.
    async fn connect(&mut self, headers: &AuthHeaders) -> Result<()>;

    /// Send one command frame.
    async fn send_command(&mut self, command: &Command) -> Result<()>;

    /// Wait for exactly one message. A closed channel is an error here.
    async fn recv_message(&mut self) -> Result<ControlMessage>;

    /// Wait for the next message, or `None` once the channel has closed.
    async fn next_message(&mut self) -> Result<Option<ControlMessage>>;

    /// Release the channel. Safe to call in any state, any number of times.
    async fn disconnect(&mut self);
}

/// Creates a fresh control channel per session.
pub trait ChannelFactory: Send + Sync {
    /// New, unconnected channel
    fn create(&self) -> Box<dyn ControlChannel>;
}

/// One-shot upload/download client.
#[async_trait]
pub trait DataTransfer: Send + Sync {
    /// Upload `content` to `destination`. Does nothing when `content` is `None`.
    async fn upload_associated_file(
        &self,
        destination: &PresignedPost,
        content: Option<Bytes>,
    ) -> Result<()>;

    /// Fetch the payload behind `url`.
    async fn download_payload(&self, url: &str) -> Result<Bytes>;
}

/// Messages from `channel` until it closes.
///
/// Ends after the first error. Not restartable: a closed channel yields
/// nothing further.
pub fn listen(channel: &mut dyn ControlChannel) -> BoxStream<'_, Result<ControlMessage>> {
    futures::stream::unfold(Some(channel), |channel| async move {
        let channel = channel?;
        match channel.next_message().await {
            Ok(Some(message)) => Some((Ok(message), Some(channel))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

//! # Techread Client
//!
//! Submits a technical drawing to the techread analysis service and streams
//! back typed result messages until the job completes or fails.
//!
//! ## Features
//!
//! - **Session protocol**: INITIALIZE → upload → READ → results, as an explicit
//!   state machine
//! - **Two transports**: a persistent WebSocket control channel and one-shot
//!   HTTPS uploads/downloads to service-issued destinations
//! - **One failure vocabulary**: uploads rejected locally surface as the same
//!   in-band ASK exceptions the service would send
//! - **Pull or push**: iterate a [`client::MessageStream`] or register
//!   [`client::Hook`]s
//! - **Cancellation-safe**: dropping the stream still disconnects the channel
//!
//! ## Session Overview
//!
//! ```text
//! Client                     Control channel (WSS)          Upload/Download (HTTPS)
//!    |                               |                                |
//!    |--- INITIALIZE (asks) -------->|                                |
//!    |<-- PROGRESS/INITIALIZATION ---|                                |
//!    |                               |                                |
//!    |================ POST drawing (+ model) =======================>|
//!    |                               |                                |
//!    |--- READ --------------------->|                                |
//!    |<-- PROGRESS / ASK ... --------|                                |
//!    |=============== GET payload_url (when referenced) =============>|
//!    |<-- PROGRESS/COMPLETED --------|                                |
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use techread::{Ask, AskType, Config, ReadRequest, TechreadClient};
//!
//! let client = TechreadClient::from_token("my-token", Config::default())?;
//! let drawing = std::fs::read("drawing.pdf")?;
//!
//! let mut messages = client.read_drawing(ReadRequest::new(
//!     drawing,
//!     vec![Ask::new(AskType::TITLE_BLOCK)],
//! ));
//! while let Some(message) = messages.next().await {
//!     let message = message?;
//!     println!("{}:{}", message.message_type, message.message_subtype);
//! }
//! ```
//!
//! ### Hooks
//!
//! ```rust,ignore
//! use techread::{Ask, AskType, Hook, HookCallback};
//!
//! let hooks = vec![Hook::for_ask(
//!     Ask::new(AskType::TITLE_BLOCK),
//!     HookCallback::new(|message| println!("{:?}", message.payload_dict)),
//! )];
//! client.read_drawing_with_hooks(drawing, &hooks, 5, None).await?;
//! ```
//!
//! ## Modules
//!
//! - [`client`]: session orchestration and hook dispatch
//! - [`protocol`]: messages, asks, exceptions, session state machine
//! - [`transport`]: control channel and data transfer implementations
//! - [`auth`]: authorization header providers
//! - [`config`]: configuration management
//! - [`error`]: error types and result aliases

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use auth::{AuthHeaders, AuthProvider, TokenAuth};
pub use client::{Hook, HookCallback, MessageStream, ReadRequest, TechreadClient};
pub use config::Config;
pub use error::{ErrorKind, Result, TechreadError};
pub use protocol::{
    Ask, AskType, ControlMessage, ExceptionLevel, ExceptionType, MessageSubtype, MessageType,
    SessionState, TechreadException, TerminationReason,
};
pub use transport::{CallbackRequest, ChannelFactory, ControlChannel, DataTransfer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

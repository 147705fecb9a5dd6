//! Session orchestration.
//!
//! [`TechreadClient::read_drawing`] drives one session end to end:
//!
//! 1. connect the control channel with the configured authorization
//! 2. send INITIALIZE and yield the response, whatever it says
//! 3. stop if the response carries exceptions
//! 4. upload the drawing, then the optional model, to the issued destination;
//!    400/413 rejections become ASK exception messages and end the session
//! 5. send READ
//! 6. yield every message, resolving payload references first, until
//!    PROGRESS/COMPLETED or until the service closes the channel
//! 7. disconnect, on every exit path
//!
//! The session runs in its own task and feeds a bounded queue. The returned
//! [`MessageStream`] reads from that queue; dropping it cancels the session,
//! which still disconnects exactly once.

pub mod hooks;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

pub use hooks::{dispatch, select_hook, Hook, HookCallback, HookSelector};

use crate::auth::{AuthProvider, TokenAuth};
use crate::config::Config;
use crate::error::{ErrorKind, Result, TechreadError};
use crate::protocol::{
    translate, Ask, Command, ControlMessage, PresignedPost, Session, SessionState,
    TerminationReason,
};
use crate::transport::{
    listen, CallbackRequest, ChannelFactory, ControlChannel, DataTransfer, HttpsClient,
    WssChannelFactory,
};

/// Default page limit for [`TechreadClient::read_drawing`]
pub const DEFAULT_MAX_PAGES: u32 = 1;

/// Default page limit for [`TechreadClient::read_drawing_with_hooks`]
pub const DEFAULT_HOOK_MAX_PAGES: u32 = 5;

/// Messages buffered between the session task and the consumer
const MESSAGE_BUFFER: usize = 1;

/// One drawing read request
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Drawing content
    pub drawing: Bytes,
    /// Requested asks
    pub asks: Vec<Ask>,
    /// Optional 3D model, uploaded after the drawing
    pub model: Option<Bytes>,
    /// Maximum number of pages to process
    pub max_pages: u32,
    /// Optional drawing filename
    pub drawing_filename: Option<String>,
}

impl ReadRequest {
    /// Request with default page limit and no model
    pub fn new(drawing: impl Into<Bytes>, asks: Vec<Ask>) -> Self {
        Self {
            drawing: drawing.into(),
            asks,
            model: None,
            max_pages: DEFAULT_MAX_PAGES,
            drawing_filename: None,
        }
    }

    /// Attach a model file
    pub fn with_model(mut self, model: impl Into<Bytes>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the page limit
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the drawing filename
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.drawing_filename = Some(filename.into());
        self
    }
}

/// Messages of one session, in order.
///
/// Ends after PROGRESS/COMPLETED, after the service closes the channel, after
/// an init or upload failure has been reported, or after yielding one error.
pub struct MessageStream {
    rx: mpsc::Receiver<Result<ControlMessage>>,
    state: watch::Receiver<SessionState>,
}

impl MessageStream {
    /// Current session state.
    ///
    /// The session task publishes its final state after disconnecting, so the
    /// value may still read `Reading` right after PROGRESS/COMPLETED has been
    /// received. It is final once `next()` has returned `None`.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

impl Stream for MessageStream {
    type Item = Result<ControlMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// What the session task needs from the client
#[derive(Clone)]
struct SessionContext {
    auth: Arc<dyn AuthProvider>,
    transfer: Arc<dyn DataTransfer>,
    development_key: Option<String>,
}

/// Techread API client
#[derive(Clone)]
pub struct TechreadClient {
    config: Config,
    auth: Arc<dyn AuthProvider>,
    channels: Arc<dyn ChannelFactory>,
    transfer: Arc<dyn DataTransfer>,
    https: HttpsClient,
}

impl TechreadClient {
    /// Client for `config` using `auth` for all requests
    pub fn new(config: Config, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let https = HttpsClient::new(&config.server)?;
        Ok(Self {
            channels: Arc::new(WssChannelFactory::new(&config.server)),
            transfer: Arc::new(https.clone()),
            https,
            auth,
            config,
        })
    }

    /// Client authenticated with a token
    pub fn from_token(token: impl Into<String>, config: Config) -> Result<Self> {
        Self::new(config, Arc::new(TokenAuth::new(token)?))
    }

    /// Client using the token from `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let token = config.auth.token.clone().ok_or_else(|| {
            TechreadError::Config("No auth token configured".to_string())
        })?;
        Self::from_token(token, config)
    }

    /// Client configured from the default config file and the environment
    pub fn from_env() -> Result<Self> {
        Self::from_config(Config::load()?)
    }

    /// Replace the control channel factory
    pub fn with_channel_factory(mut self, channels: Arc<dyn ChannelFactory>) -> Self {
        self.channels = channels;
        self
    }

    /// Replace the upload/download client
    pub fn with_data_transfer(mut self, transfer: Arc<dyn DataTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Submit a drawing and stream back the session's messages.
    ///
    /// Must be called from within a tokio runtime; the session runs as a
    /// spawned task.
    pub fn read_drawing(&self, request: ReadRequest) -> MessageStream {
        let session = Session::new(
            request.asks.clone(),
            request.max_pages,
            request.drawing_filename.clone(),
        );
        let state = session.subscribe();
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);

        let ctx = SessionContext {
            auth: self.auth.clone(),
            transfer: self.transfer.clone(),
            development_key: self.config.auth.development_key.clone(),
        };
        let channel = self.channels.create();

        tokio::spawn(run_session(ctx, channel, session, request, tx));

        MessageStream { rx, state }
    }

    /// Submit a drawing and route every message to `hooks`.
    ///
    /// The asks submitted are the ones the hooks listen for. Returns once the
    /// session has terminated.
    pub async fn read_drawing_with_hooks(
        &self,
        drawing: impl Into<Bytes>,
        hooks: &[Hook],
        max_pages: u32,
        drawing_filename: Option<String>,
    ) -> Result<()> {
        let asks = hooks.iter().filter_map(Hook::ask).cloned().collect();
        let mut request = ReadRequest::new(drawing, asks).with_max_pages(max_pages);
        request.drawing_filename = drawing_filename;

        let mut messages = self.read_drawing(request);
        while let Some(message) = messages.next().await {
            let message = message.inspect_err(|e| tracing::error!("Session failed: {}", e))?;
            dispatch(message, hooks).await;
        }
        Ok(())
    }

    /// Submit a drawing whose results are posted to a callback URL.
    pub async fn read_drawing_with_callback(&self, request: CallbackRequest) -> Result<Uuid> {
        let headers = self.auth.auth_headers()?;
        self.https.read_drawing_with_callback(&headers, request).await
    }
}

async fn run_session(
    ctx: SessionContext,
    mut channel: Box<dyn ControlChannel>,
    mut session: Session,
    request: ReadRequest,
    tx: mpsc::Sender<Result<ControlMessage>>,
) {
    let outcome = tokio::select! {
        outcome = drive(&ctx, channel.as_mut(), &mut session, request, &tx) => outcome,
        () = tx.closed() => Ok(TerminationReason::Cancelled),
    };

    channel.disconnect().await;

    match outcome {
        Ok(reason) => {
            session.terminate(reason);
        },
        Err(e) => {
            session.terminate(TerminationReason::Failed);
            tracing::debug!(session = %session.id(), "session failed: {}", e);
            // The consumer may already be gone; nothing left to report to.
            let _ = tx.send(Err(e)).await;
        },
    }
}

async fn drive(
    ctx: &SessionContext,
    channel: &mut dyn ControlChannel,
    session: &mut Session,
    request: ReadRequest,
    tx: &mpsc::Sender<Result<ControlMessage>>,
) -> Result<TerminationReason> {
    let headers = ctx.auth.auth_headers()?;
    channel.connect(&headers).await?;
    session.advance(SessionState::Connected)?;

    let init_request = session.initialize_request(ctx.development_key.clone());
    channel.send_command(&Command::initialize(&init_request)?).await?;
    let message = channel.recv_message().await?;
    session.record_message();

    if message.has_exceptions() {
        session.set_request_id(message.request_id);
        if !emit(tx, message).await {
            return Ok(TerminationReason::Cancelled);
        }
        return Ok(TerminationReason::InitializationFailed);
    }

    let init = message.init_response()?;
    session.set_request_id(init.request_id.or(message.request_id));
    if !emit(tx, message).await {
        return Ok(TerminationReason::Cancelled);
    }
    if !init.exceptions.is_empty() {
        return Ok(TerminationReason::InitializationFailed);
    }
    session.advance(SessionState::Initialized)?;

    session.advance(SessionState::Uploading)?;
    if let Err(error) = upload(
        ctx.transfer.as_ref(),
        session,
        &init.drawing_presigned_post,
        request.drawing,
        request.model,
    )
    .await
    {
        if !matches!(error.kind(), ErrorKind::BadRequest | ErrorKind::RequestTooLarge) {
            return Err(error);
        }

        tracing::warn!("Upload rejected, reporting as ask exceptions: {}", error);
        for mut message in translate(session.asks(), &error)? {
            message.request_id = session.request_id();
            if !emit(tx, message).await {
                return Ok(TerminationReason::Cancelled);
            }
        }
        return Ok(TerminationReason::UploadRejected);
    }

    channel.send_command(&Command::read()).await?;
    session.advance(SessionState::Reading)?;

    let mut messages = listen(channel);
    while let Some(message) = messages.next().await {
        let mut message = message?;
        session.record_message();

        if message.needs_download() {
            if let Some(url) = message.payload_url.take() {
                message.payload_bytes = Some(ctx.transfer.download_payload(&url).await?);
                session.record_download();
            }
        }

        let completed = message.is_completed();
        if !emit(tx, message).await {
            return Ok(TerminationReason::Cancelled);
        }
        if completed {
            return Ok(TerminationReason::Completed);
        }
    }

    Ok(TerminationReason::ChannelClosed)
}

/// Upload the drawing, then the model.
///
/// The service issues one destination per session, so the model goes to the
/// drawing's destination as well.
async fn upload(
    transfer: &dyn DataTransfer,
    session: &mut Session,
    destination: &PresignedPost,
    drawing: Bytes,
    model: Option<Bytes>,
) -> Result<()> {
    let drawing_len = drawing.len();
    transfer
        .upload_associated_file(destination, Some(drawing))
        .await?;
    session.record_upload(drawing_len);

    if let Some(model) = model {
        let model_len = model.len();
        transfer
            .upload_associated_file(destination, Some(model))
            .await?;
        session.record_upload(model_len);
    }
    Ok(())
}

/// Hand `message` to the consumer. `false` once the consumer is gone.
async fn emit(tx: &mpsc::Sender<Result<ControlMessage>>, message: ControlMessage) -> bool {
    tx.send(Ok(message)).await.is_ok()
}

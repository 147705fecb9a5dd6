//! Session state for one drawing read.
//!
//! Tracks the lifecycle of a single `read_drawing` invocation: the requested
//! asks, the request ID the service assigns, the current state, and counters.
//! State changes are published on a `watch` channel so the consumer of the
//! message stream can observe them.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use uuid::Uuid;

use super::{Ask, InitializeRequest};
use crate::error::{Result, TechreadError};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// PROGRESS/COMPLETED received
    Completed,
    /// The INITIALIZE response carried exceptions
    InitializationFailed,
    /// The upload was rejected and translated into ask exceptions
    UploadRejected,
    /// The service closed the channel before completion
    ChannelClosed,
    /// The consumer dropped the message stream
    Cancelled,
    /// An error was propagated to the consumer
    Failed,
}

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet
    Idle,
    /// Control channel open
    Connected,
    /// INITIALIZE answered without exceptions
    Initialized,
    /// Uploading drawing (and model)
    Uploading,
    /// READ sent, streaming results
    Reading,
    /// Session over
    Terminated(TerminationReason),
}

impl SessionState {
    /// Is this the terminal state
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    fn can_advance_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Connected)
                | (Self::Connected, Self::Initialized)
                | (Self::Initialized, Self::Uploading)
                | (Self::Uploading, Self::Reading)
        ) || (!self.is_terminated() && next.is_terminated())
    }
}

/// One drawing read
pub struct Session {
    /// Local ID for log correlation
    id: Uuid,
    /// Request ID assigned by the service
    request_id: Option<Uuid>,
    /// Requested asks
    asks: Vec<Ask>,
    /// Page limit
    max_pages: u32,
    /// Drawing filename
    drawing_filename: Option<String>,
    /// Current state
    state: SessionState,
    /// State publisher
    state_tx: watch::Sender<SessionState>,
    /// Creation timestamp
    started: Instant,
    /// Messages received over the control channel
    messages_received: u64,
    /// Payload references resolved
    payloads_downloaded: u64,
    /// Bytes uploaded
    bytes_uploaded: u64,
}

impl Session {
    /// Create a new idle session
    pub fn new(asks: Vec<Ask>, max_pages: u32, drawing_filename: Option<String>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            id: Uuid::new_v4(),
            request_id: None,
            asks,
            max_pages,
            drawing_filename,
            state: SessionState::Idle,
            state_tx,
            started: Instant::now(),
            messages_received: 0,
            payloads_downloaded: 0,
            bytes_uploaded: 0,
        }
    }

    /// Local session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request ID assigned by the service, once initialized
    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    /// Requested asks
    pub fn asks(&self) -> &[Ask] {
        &self.asks
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Body of the INITIALIZE command for this session
    pub fn initialize_request(&self, development_key: Option<String>) -> InitializeRequest {
        InitializeRequest {
            asks: self.asks.clone(),
            development_key,
            max_pages: self.max_pages,
            drawing_filename: self.drawing_filename.clone(),
        }
    }

    /// Move to the next state
    pub fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(TechreadError::Protocol(format!(
                "Cannot move session from {:?} to {:?}",
                self.state, next
            )));
        }

        tracing::debug!(session = %self.id, from = ?self.state, to = ?next, "session transition");
        self.set_state(next);
        Ok(())
    }

    /// Terminate the session. Only the first reason sticks.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.state.is_terminated() {
            return false;
        }

        self.set_state(SessionState::Terminated(reason));
        let stats = self.stats();
        tracing::info!(
            session = %self.id,
            request_id = ?stats.request_id,
            ?reason,
            messages = stats.messages_received,
            downloads = stats.payloads_downloaded,
            uploaded = stats.bytes_uploaded,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "session terminated"
        );
        true
    }

    /// Record the request ID from the INITIALIZE response
    pub fn set_request_id(&mut self, request_id: Option<Uuid>) {
        if request_id.is_some() {
            self.request_id = request_id;
        }
    }

    /// Count a received message
    pub fn record_message(&mut self) {
        self.messages_received += 1;
    }

    /// Count a resolved payload reference
    pub fn record_download(&mut self) {
        self.payloads_downloaded += 1;
    }

    /// Count uploaded bytes
    pub fn record_upload(&mut self, bytes: usize) {
        self.bytes_uploaded += bytes as u64;
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id,
            request_id: self.request_id,
            state: self.state,
            messages_received: self.messages_received,
            payloads_downloaded: self.payloads_downloaded,
            bytes_uploaded: self.bytes_uploaded,
            elapsed: self.started.elapsed(),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

/// Session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Local session ID
    pub session_id: Uuid,
    /// Request ID assigned by the service
    pub request_id: Option<Uuid>,
    /// Current state
    pub state: SessionState,
    /// Messages received
    pub messages_received: u64,
    /// Payload references resolved
    pub payloads_downloaded: u64,
    /// Bytes uploaded
    pub bytes_uploaded: u64,
    /// Time since the session was created
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AskType;

    fn session() -> Session {
        Session::new(vec![Ask::new(AskType::PAGE_THUMBNAIL)], 1, None)
    }

    #[test]
    fn test_session_happy_path() {
        let mut session = session();
        let rx = session.subscribe();
        assert_eq!(session.state(), SessionState::Idle);

        session.advance(SessionState::Connected).unwrap();
        session.advance(SessionState::Initialized).unwrap();
        session.advance(SessionState::Uploading).unwrap();
        session.advance(SessionState::Reading).unwrap();
        assert!(session.terminate(TerminationReason::Completed));

        assert_eq!(
            *rx.borrow(),
            SessionState::Terminated(TerminationReason::Completed)
        );
    }

    #[test]
    fn test_session_rejects_skipped_states() {
        let mut session = session();
        assert!(session.advance(SessionState::Reading).is_err());

        session.advance(SessionState::Connected).unwrap();
        assert!(session.advance(SessionState::Uploading).is_err());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_terminate_is_sticky() {
        let mut session = session();
        session.advance(SessionState::Connected).unwrap();
        assert!(session.terminate(TerminationReason::InitializationFailed));
        assert!(!session.terminate(TerminationReason::Failed));
        assert_eq!(
            session.state(),
            SessionState::Terminated(TerminationReason::InitializationFailed)
        );
        assert!(session.advance(SessionState::Initialized).is_err());
    }

    #[test]
    fn test_initialize_request() {
        let session = Session::new(
            vec![Ask::new(AskType::TITLE_BLOCK)],
            3,
            Some("part.pdf".to_string()),
        );
        let request = session.initialize_request(Some("dev".to_string()));
        assert_eq!(request.max_pages, 3);
        assert_eq!(request.asks.len(), 1);
        assert_eq!(request.development_key.as_deref(), Some("dev"));
        assert_eq!(request.drawing_filename.as_deref(), Some("part.pdf"));
    }

    #[test]
    fn test_session_stats() {
        let mut session = session();
        session.set_request_id(Some(Uuid::nil()));
        session.set_request_id(None);
        session.record_message();
        session.record_message();
        session.record_download();
        session.record_upload(1024);

        let stats = session.stats();
        assert_eq!(stats.request_id, Some(Uuid::nil()));
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.payloads_downloaded, 1);
        assert_eq!(stats.bytes_uploaded, 1024);
    }
}

//! Techread client error types.
//!
//! # Failure Vocabulary
//!
//! Every failure a session can produce is one [`TechreadError`] variant.
//! Variants carry a human-readable context string; the variant itself is the
//! machine-readable kind, exposed as a `Copy` tag through
//! [`TechreadError::kind`]. The tag is what the exception translator keys its
//! lookup table on, so translation never depends on runtime type identity.
//!
//! | Kind                   | Raised by                                      |
//! |------------------------|------------------------------------------------|
//! | `Connection`           | control channel handshake / socket failures    |
//! | `ChannelNotOpen`       | commands on an unconnected or closed channel   |
//! | `Decode`               | malformed control messages or payloads         |
//! | `Unauthorized`         | 401-403 responses, refused handshakes          |
//! | `BadRequest`           | 400 responses                                  |
//! | `RequestTooLarge`      | 413 responses                                  |
//! | `UnsupportedMediaType` | 415 responses                                  |
//! | `ResourceNotFound`     | 404 responses                                  |
//! | `Server`               | any other non-2xx response                     |
//! | `UnmappedErrorKind`    | translating an error kind with no table entry  |

use thiserror::Error;

/// Techread client errors.
#[derive(Error, Debug)]
pub enum TechreadError {
    /// The control channel could not be established or broke down.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A command was issued on a channel that is not open.
    #[error("The control channel is not open")]
    ChannelNotOpen,

    /// A control message or payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Credentials were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The request body cannot be interpreted.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request exceeds the maximal request size.
    #[error("Request too large: {0}")]
    RequestTooLarge(String),

    /// The file format is not supported.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The referenced resource does not exist.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Generic server-side failure.
    #[error("Server error: {0}")]
    Server(String),

    /// An error kind was handed to the exception translator that has no
    /// structured counterpart.
    #[error("No structured exception for error kind {0:?}")]
    UnmappedErrorKind(ErrorKind),

    /// Protocol-level error (unexpected state or server payload).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network communication error without an HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for techread operations
pub type Result<T> = std::result::Result<T, TechreadError>;

/// Discriminant of a [`TechreadError`], without its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`TechreadError::Connection`].
    Connection,
    /// See [`TechreadError::ChannelNotOpen`].
    ChannelNotOpen,
    /// See [`TechreadError::Decode`].
    Decode,
    /// See [`TechreadError::Unauthorized`].
    Unauthorized,
    /// See [`TechreadError::BadRequest`].
    BadRequest,
    /// See [`TechreadError::RequestTooLarge`].
    RequestTooLarge,
    /// See [`TechreadError::UnsupportedMediaType`].
    UnsupportedMediaType,
    /// See [`TechreadError::ResourceNotFound`].
    ResourceNotFound,
    /// See [`TechreadError::Server`].
    Server,
    /// See [`TechreadError::UnmappedErrorKind`].
    UnmappedErrorKind,
    /// See [`TechreadError::Protocol`].
    Protocol,
    /// See [`TechreadError::Network`].
    Network,
    /// See [`TechreadError::Config`].
    Config,
    /// See [`TechreadError::Json`].
    Json,
    /// See [`TechreadError::Io`].
    Io,
}

impl TechreadError {
    /// Tag identifying the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::ChannelNotOpen => ErrorKind::ChannelNotOpen,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::RequestTooLarge(_) => ErrorKind::RequestTooLarge,
            Self::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            Self::ResourceNotFound(_) => ErrorKind::ResourceNotFound,
            Self::Server(_) => ErrorKind::Server,
            Self::UnmappedErrorKind(_) => ErrorKind::UnmappedErrorKind,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Network(_) => ErrorKind::Network,
            Self::Config(_) => ErrorKind::Config,
            Self::Json(_) => ErrorKind::Json,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Header and body shown to CLI users for this error.
    pub fn cli_message(&self) -> (&'static str, &'static str) {
        match self.kind() {
            ErrorKind::RequestTooLarge => (
                "Request Too Large",
                "The request size exceeds the maximal request size of 10MB.\n\
                 Please check https://docs.werk24.io/limitations/drawing_file_size.html\n\
                 for the most up-to-date information on the maximal request size.",
            ),
            ErrorKind::UnsupportedMediaType => (
                "Unsupported Media Type",
                "The file format you uploaded is not supported.\n\
                 Please check https://docs.werk24.io/limitations/drawing_file_format.html\n\
                 for a current list of supported file formats.",
            ),
            ErrorKind::Server => (
                "Server Error",
                "A Server Error occurred while processing your request.\n\
                 This indicates a problem with the server. Please try again later.\n\
                 If the problem persists, please contact info@werk24.io.",
            ),
            ErrorKind::Unauthorized => (
                "Unauthorized",
                "Your credentials were rejected. Check the token you are using.",
            ),
            ErrorKind::Config => (
                "License Error",
                "An error occurred while loading the license information.\n\
                 The client looks for it in:\n\n\
                 1. The environment variable W24TECHREAD_AUTH_TOKEN, and\n\
                 2. the [auth] section of the configuration file.",
            ),
            _ => (
                "Techread Error",
                "An error occurred while processing your request.",
            ),
        }
    }
}

impl From<reqwest::Error> for TechreadError {
    fn from(err: reqwest::Error) -> Self {
        TechreadError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for TechreadError {
    fn from(err: toml::de::Error) -> Self {
        TechreadError::Config(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TechreadError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::Http(response) if matches!(response.status().as_u16(), 401..=403) => {
                TechreadError::Unauthorized(format!(
                    "Handshake refused with code {}",
                    response.status()
                ))
            },
            WsError::ConnectionClosed | WsError::AlreadyClosed => TechreadError::ChannelNotOpen,
            other => TechreadError::Connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            TechreadError::RequestTooLarge("x".into()).kind(),
            ErrorKind::RequestTooLarge
        );
        assert_eq!(TechreadError::ChannelNotOpen.kind(), ErrorKind::ChannelNotOpen);
        assert_eq!(
            TechreadError::UnmappedErrorKind(ErrorKind::Server).kind(),
            ErrorKind::UnmappedErrorKind
        );
    }

    #[test]
    fn test_cli_message_for_size_errors() {
        let (header, body) = TechreadError::RequestTooLarge("upload".into()).cli_message();
        assert_eq!(header, "Request Too Large");
        assert!(body.contains("10MB"));

        let (header, _) = TechreadError::Decode("bad".into()).cli_message();
        assert_eq!(header, "Techread Error");
    }

    #[test]
    fn test_refused_handshake_is_unauthorized() {
        let response = tokio_tungstenite::tungstenite::http::Response::builder()
            .status(403)
            .body(None)
            .unwrap();
        let err: TechreadError = tokio_tungstenite::tungstenite::Error::Http(response).into();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}

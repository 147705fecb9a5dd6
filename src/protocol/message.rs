//! Control channel messages.
//!
//! Defines the inbound [`ControlMessage`] envelope, the outbound [`Command`]
//! frame, and the INITIALIZE request/response bodies.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Ask, AskType, TechreadException};
use crate::error::{Result, TechreadError};

/// Message types on the control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// Result for one ask; the subtype is the ask type
    Ask,
    /// Job lifecycle progress (including the INITIALIZE response)
    Progress,
    /// Service-side failure not tied to a single ask
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ask => "ASK",
            Self::Progress => "PROGRESS",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Message subtype. For ASK messages this is the ask type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageSubtype(Cow<'static, str>);

impl MessageSubtype {
    /// Response to INITIALIZE
    pub const INITIALIZATION: Self = Self(Cow::Borrowed("INITIALIZATION"));
    /// Processing has started
    pub const STARTED: Self = Self(Cow::Borrowed("STARTED"));
    /// Processing has completed; terminal
    pub const COMPLETED: Self = Self(Cow::Borrowed("COMPLETED"));

    /// Arbitrary subtype
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Does this subtype name the given ask type
    pub fn is_ask(&self, ask_type: &AskType) -> bool {
        self.as_str() == ask_type.as_str()
    }
}

impl From<&AskType> for MessageSubtype {
    fn from(ask_type: &AskType) -> Self {
        Self::new(ask_type.as_str())
    }
}

impl fmt::Display for MessageSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message received over the control channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Request ID assigned by the service
    #[serde(default)]
    pub request_id: Option<Uuid>,
    /// Message type
    pub message_type: MessageType,
    /// Message subtype
    pub message_subtype: MessageSubtype,
    /// Page the message refers to
    #[serde(default)]
    pub page_number: u32,
    /// Structured exceptions
    #[serde(default)]
    pub exceptions: Vec<TechreadException>,
    /// Inline structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_dict: Option<Value>,
    /// Reference to a large payload, resolved before the message is yielded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_url: Option<String>,
    /// Inline binary payload (base64 on the wire)
    #[serde(
        default,
        with = "payload_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload_bytes: Option<Bytes>,
}

impl ControlMessage {
    /// Create a message without payload
    pub fn new(message_type: MessageType, message_subtype: MessageSubtype) -> Self {
        Self {
            request_id: None,
            message_type,
            message_subtype,
            page_number: 0,
            exceptions: Vec::new(),
            payload_dict: None,
            payload_url: None,
            payload_bytes: None,
        }
    }

    /// Decode and validate a raw control channel frame
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let message: Self = serde_json::from_slice(raw)
            .map_err(|e| TechreadError::Decode(format!("Invalid control message: {e}")))?;

        if message.message_subtype.as_str().is_empty() {
            return Err(TechreadError::Decode(format!(
                "{} message without subtype",
                message.message_type
            )));
        }

        Ok(message)
    }

    /// Is this the terminal PROGRESS/COMPLETED message
    pub fn is_completed(&self) -> bool {
        self.message_type == MessageType::Progress
            && self.message_subtype == MessageSubtype::COMPLETED
    }

    /// Does this message carry exceptions
    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    /// Is the payload a reference that still needs downloading
    pub fn needs_download(&self) -> bool {
        self.payload_url.is_some() && self.payload_bytes.is_none()
    }

    /// Interpret the payload as an INITIALIZE response
    pub fn init_response(&self) -> Result<InitResponse> {
        let payload = self.payload_dict.as_ref().ok_or_else(|| {
            TechreadError::Decode("INITIALIZE response without payload".to_string())
        })?;

        InitResponse::deserialize(payload).map_err(|e| {
            // The service puts a plain `message` in the payload when it refuses
            // to initialize; that text is more useful than the schema error.
            match payload.get("message").and_then(Value::as_str) {
                Some(text) => TechreadError::Protocol(text.to_string()),
                None => TechreadError::Decode(format!("Invalid INITIALIZE response: {e}")),
            }
        })
    }
}

/// Upload destination issued by the service for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedPost {
    /// Destination URL
    pub url: String,
    /// Form fields that must accompany the upload
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Payload of the INITIALIZE response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitResponse {
    /// Request ID assigned to this session
    #[serde(default)]
    pub request_id: Option<Uuid>,
    /// Upload destination for the drawing
    pub drawing_presigned_post: PresignedPost,
    /// Structured exceptions that prevent the session from starting
    #[serde(default)]
    pub exceptions: Vec<TechreadException>,
}

/// Command actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Start a job
    Initialize,
    /// Start reading the uploaded files
    Read,
}

/// Outbound frame: `{"action": ..., "message": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Action
    pub action: Action,
    /// Action body
    pub message: Value,
}

impl Command {
    /// INITIALIZE command
    pub fn initialize(request: &InitializeRequest) -> Result<Self> {
        Ok(Self {
            action: Action::Initialize,
            message: serde_json::to_value(request)?,
        })
    }

    /// READ command with an empty body
    pub fn read() -> Self {
        Self {
            action: Action::Read,
            message: Value::Object(serde_json::Map::new()),
        }
    }

    /// Serialize as one text frame
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Body of the INITIALIZE command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// Requested asks
    pub asks: Vec<Ask>,
    /// Optional development key
    pub development_key: Option<String>,
    /// Maximum number of pages to process
    pub max_pages: u32,
    /// Optional drawing filename
    pub drawing_filename: Option<String>,
}

mod payload_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Bytes>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Bytes>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|e| {
                STANDARD
                    .decode(e)
                    .map(Bytes::from)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_progress() {
        let raw = br#"{"request_id":null,"message_type":"PROGRESS","message_subtype":"COMPLETED"}"#;
        let message = ControlMessage::decode(raw).unwrap();
        assert!(message.is_completed());
        assert!(!message.has_exceptions());
        assert_eq!(message.page_number, 0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ControlMessage::decode(b"not json"),
            Err(TechreadError::Decode(_))
        ));
        assert!(matches!(
            ControlMessage::decode(br#"{"message_type":"ASK","message_subtype":""}"#),
            Err(TechreadError::Decode(_))
        ));
        assert!(matches!(
            ControlMessage::decode(br#"{"message_type":"BOGUS","message_subtype":"X"}"#),
            Err(TechreadError::Decode(_))
        ));
    }

    #[test]
    fn test_payload_bytes_are_base64() {
        let raw = br#"{"message_type":"ASK","message_subtype":"PAGE_THUMBNAIL","payload_bytes":"aGVsbG8="}"#;
        let message = ControlMessage::decode(raw).unwrap();
        assert_eq!(message.payload_bytes.as_deref(), Some(&b"hello"[..]));
        assert!(!message.needs_download());

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["payload_bytes"], "aGVsbG8=");
    }

    #[test]
    fn test_init_response() {
        let mut message = ControlMessage::new(MessageType::Progress, MessageSubtype::INITIALIZATION);
        message.payload_dict = Some(json!({
            "drawing_presigned_post": {"url": "https://upload", "fields": {"key": "abc"}},
            "exceptions": []
        }));

        let init = message.init_response().unwrap();
        assert_eq!(init.drawing_presigned_post.url, "https://upload");
        assert_eq!(init.drawing_presigned_post.fields["key"], "abc");
        assert!(init.exceptions.is_empty());
    }

    #[test]
    fn test_init_response_surfaces_server_text() {
        let mut message = ControlMessage::new(MessageType::Progress, MessageSubtype::INITIALIZATION);
        message.payload_dict = Some(json!({"message": "Forbidden"}));

        match message.init_response() {
            Err(TechreadError::Protocol(text)) => assert_eq!(text, "Forbidden"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_command_frames() {
        let request = InitializeRequest {
            asks: vec![Ask::new(AskType::TITLE_BLOCK)],
            development_key: None,
            max_pages: 1,
            drawing_filename: Some("part.pdf".to_string()),
        };
        let command = Command::initialize(&request).unwrap();
        let value: Value = serde_json::from_str(&command.encode().unwrap()).unwrap();
        assert_eq!(value["action"], "INITIALIZE");
        assert_eq!(value["message"]["maxPages"], 1);
        assert_eq!(value["message"]["drawingFilename"], "part.pdf");
        assert_eq!(value["message"]["asks"][0]["ask_type"], "TITLE_BLOCK");
        assert!(value["message"]["developmentKey"].is_null());

        let read: Value = serde_json::from_str(&Command::read().encode().unwrap()).unwrap();
        assert_eq!(read, json!({"action": "READ", "message": {}}));
    }
}

//! Structured exceptions reported in-band by the service.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a structured exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExceptionLevel {
    /// The ask could not be answered
    Error,
    /// The ask was answered with reduced quality
    Warning,
}

/// Exception type tag, open-ended like [`super::AskType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionType(Cow<'static, str>);

impl ExceptionType {
    /// The drawing file exceeds the size limit
    pub const DRAWING_FILE_SIZE_TOO_LARGE: Self =
        Self(Cow::Borrowed("DRAWING_FILE_SIZE_TOO_LARGE"));
    /// The drawing file format is not supported
    pub const DRAWING_FILE_FORMAT_UNSUPPORTED: Self =
        Self(Cow::Borrowed("DRAWING_FILE_FORMAT_UNSUPPORTED"));
    /// The drawing resolution is too low
    pub const DRAWING_RESOLUTION_TOO_LOW: Self =
        Self(Cow::Borrowed("DRAWING_RESOLUTION_TOO_LOW"));
    /// The drawing content could not be understood
    pub const DRAWING_CONTENT_NOT_UNDERSTOOD: Self =
        Self(Cow::Borrowed("DRAWING_CONTENT_NOT_UNDERSTOOD"));

    /// Arbitrary exception type
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One structured exception attached to a control message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechreadException {
    /// Severity
    pub exception_level: ExceptionLevel,
    /// Type tag
    pub exception_type: ExceptionType,
}

impl TechreadException {
    /// ERROR-level exception of the given type
    pub fn error(exception_type: ExceptionType) -> Self {
        Self {
            exception_level: ExceptionLevel::Error,
            exception_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exception_wire_shape() {
        let exception = TechreadException::error(ExceptionType::DRAWING_FILE_SIZE_TOO_LARGE);
        assert_eq!(
            serde_json::to_value(&exception).unwrap(),
            json!({
                "exception_level": "ERROR",
                "exception_type": "DRAWING_FILE_SIZE_TOO_LARGE"
            })
        );
    }

    #[test]
    fn test_unknown_exception_type_decodes() {
        let exception: TechreadException = serde_json::from_value(json!({
            "exception_level": "WARNING",
            "exception_type": "SOMETHING_NEW"
        }))
        .unwrap();
        assert_eq!(exception.exception_level, ExceptionLevel::Warning);
        assert_eq!(exception.exception_type.as_str(), "SOMETHING_NEW");
    }
}

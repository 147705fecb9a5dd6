//! Translation of local upload failures into in-band ask exceptions.
//!
//! A drawing rejected before it reaches the service must look the same to the
//! caller as one the service rejected itself: one ASK message per requested
//! ask, each carrying a single ERROR-level exception.

use super::{Ask, ControlMessage, ExceptionType, MessageSubtype, MessageType, TechreadException};
use crate::error::{ErrorKind, Result, TechreadError};

/// Local error kinds with a structured counterpart
static EXCEPTION_TABLE: &[(ErrorKind, ExceptionType)] = &[
    (
        ErrorKind::RequestTooLarge,
        ExceptionType::DRAWING_FILE_SIZE_TOO_LARGE,
    ),
    (
        ErrorKind::BadRequest,
        ExceptionType::DRAWING_FILE_SIZE_TOO_LARGE,
    ),
];

/// Structured exception type for a local error kind, if any
pub fn exception_type_for(kind: ErrorKind) -> Option<&'static ExceptionType> {
    EXCEPTION_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, exception_type)| exception_type)
}

/// Produce one ASK exception message per ask for `error`.
///
/// Fails with [`TechreadError::UnmappedErrorKind`] when the error kind has no
/// table entry.
pub fn translate(asks: &[Ask], error: &TechreadError) -> Result<Vec<ControlMessage>> {
    let kind = error.kind();
    let exception_type =
        exception_type_for(kind).ok_or(TechreadError::UnmappedErrorKind(kind))?;

    Ok(asks
        .iter()
        .map(|ask| {
            let mut message =
                ControlMessage::new(MessageType::Ask, MessageSubtype::from(ask.ask_type()));
            message.exceptions = vec![TechreadException::error(exception_type.clone())];
            message
        })
        .collect())
}

//! Techread control protocol: message model and session state machine.
//!
//! # Message Flow
//!
//! ```text
//! Client                                   Service
//!    |                                        |
//!    |-- INITIALIZE {asks, maxPages, ...} -->|  control channel
//!    |<-------- PROGRESS/INITIALIZATION -----|  upload destination or exceptions
//!    |                                        |
//!    |== multipart POST drawing ============>|  presigned destination
//!    |== multipart POST model (optional) ===>|
//!    |                                        |
//!    |-- READ {} --------------------------->|  control channel
//!    |<-------- PROGRESS/STARTED ------------|
//!    |<-------- ASK/<ask type> --------------|  inline payload or payload_url
//!    |<-------- PROGRESS/COMPLETED ----------|  terminal
//! ```
//!
//! ## State Machine
//!
//! | State         | Description                          | Valid Transitions        |
//! |---------------|--------------------------------------|--------------------------|
//! | `Idle`        | Nothing sent yet                     | → Connected, Terminated  |
//! | `Connected`   | Control channel open                 | → Initialized, Terminated|
//! | `Initialized` | INITIALIZE answered cleanly          | → Uploading, Terminated  |
//! | `Uploading`   | Drawing/model uploads in flight      | → Reading, Terminated    |
//! | `Reading`     | READ sent, streaming results         | → Terminated             |
//! | `Terminated`  | Session over (with a reason)         | (terminal)               |
//!
//! ## Failure Translation
//!
//! Uploads rejected with 400 or 413 never reach the service's reader, so
//! [`translate`] fabricates the ASK exception messages the service would have
//! sent. Callers see one failure vocabulary either way.

mod ask;
mod exception;
mod message;
mod session;
mod translate;

pub use ask::{Ask, AskType};
pub use exception::{ExceptionLevel, ExceptionType, TechreadException};
pub use message::{
    Action, Command, ControlMessage, InitResponse, InitializeRequest, MessageSubtype, MessageType,
    PresignedPost,
};
pub use session::{Session, SessionState, SessionStats, TerminationReason};
pub use translate::{exception_type_for, translate};

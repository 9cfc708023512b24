//! Protocol errors
//!
//! Only conditions with no protocol-level recovery live here. Partial,
//! garbled or unknown input on a live link is reported as
//! [`Message`](super::Message) data instead, because the caller must keep
//! polling regardless of any single read's outcome.

use thiserror::Error;

use super::commands::Command;
use crate::schema::SchemaError;

/// Errors that can occur during head communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No schema entry for command {0:?}")]
    UnknownCommand(Command),

    #[error("Payload does not match the {expected} shape declared for {command:?}")]
    TypeMismatch {
        /// The command whose shape was violated
        command: Command,
        /// Name of the declared payload shape
        expected: &'static str,
    },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

//! Error types for the monitor protocol and dump conversion

use thiserror::Error;

/// Result alias used throughout the protocol core
pub type Result<T> = std::result::Result<T, DumpError>;

/// Errors raised while talking to the monitor or converting its output
///
/// None of these are retried internally. A desync in particular leaves the
/// monitor's input parser in an unknown state, so the only recovery is a
/// hardware reset followed by a fresh startup detection.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Failed to open serial port {port}: {reason}")]
    Connection { port: String, reason: String },

    #[error("Write timed out: device accepted {written} of {expected} bytes")]
    WriteTimeout { written: usize, expected: usize },

    #[error("Protocol desync: expected {expected:?}, received {received:?}")]
    ProtocolDesync { expected: String, received: String },

    #[error("Malformed hex dump line {line_number}: {line:?}")]
    MalformedHexLine { line_number: usize, line: String },

    #[error("Monitor session not ready for this operation (state: {state})")]
    NotReady { state: String },

    #[error("Cancelled while waiting for the monitor")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DumpError {
    /// Build a desync error from the marker we wanted and the bytes we got
    pub fn desync(expected: &[u8], received: &[u8]) -> Self {
        DumpError::ProtocolDesync {
            expected: String::from_utf8_lossy(expected).into_owned(),
            received: String::from_utf8_lossy(received).into_owned(),
        }
    }

    /// Whether recovering from this error requires resetting the board
    pub fn needs_reset(&self) -> bool {
        matches!(
            self,
            DumpError::ProtocolDesync { .. } | DumpError::WriteTimeout { .. }
        )
    }
}

//! Error types for ssdbkv
//!
//! Provides a unified error type for codec, connection and command failures.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using SsdbError
pub type Result<T> = std::result::Result<T, SsdbError>;

/// Unified error type for ssdbkv operations
#[derive(Debug, Error)]
pub enum SsdbError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timed out during {0}")]
    Timeout(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    #[error("Command error: server replied {status}{}", PayloadSummary(payload))]
    Command { status: Status, payload: Vec<Bytes> },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SsdbError {
    /// Whether the connection that produced this error can no longer be used.
    ///
    /// Framing, timeout and socket failures leave the byte stream at an
    /// unknown offset. Command-level failures arrive in a complete response,
    /// so the connection is still in sync.
    pub fn is_fatal(&self) -> bool {
        match self {
            SsdbError::Connect { .. }
            | SsdbError::ConnectionClosed
            | SsdbError::Timeout(_)
            | SsdbError::Io(_)
            | SsdbError::Protocol(_) => true,
            SsdbError::UnexpectedResponse(_)
            | SsdbError::Command { .. }
            | SsdbError::InvalidArgument(_)
            | SsdbError::Config(_) => false,
        }
    }

    /// Status code carried by a command error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            SsdbError::Command { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Renders the first payload block (the server's message) after the status.
struct PayloadSummary<'a>(&'a [Bytes]);

impl fmt::Display for PayloadSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.first() {
            Some(message) => write!(f, ": {}", String::from_utf8_lossy(message)),
            None => Ok(()),
        }
    }
}

//! Response definitions
//!
//! Represents replies from the server: a status block followed by payload
//! blocks whose meaning depends on the command.

use std::fmt;

use bytes::Bytes;

use crate::error::{Result, SsdbError};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    NotFound,
    Error,
    Fail,
    ClientError,
}

impl Status {
    /// Parse a status block
    pub fn parse(block: &[u8]) -> Option<Self> {
        match block {
            b"ok" => Some(Status::Ok),
            b"not_found" => Some(Status::NotFound),
            b"error" => Some(Status::Error),
            b"fail" => Some(Status::Fail),
            b"client_error" => Some(Status::ClientError),
            _ => None,
        }
    }

    /// Wire spelling of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::NotFound => "not_found",
            Status::Error => "error",
            Status::Fail => "fail",
            Status::ClientError => "client_error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code (first block)
    pub status: Status,

    /// Remaining blocks
    pub payload: Vec<Bytes>,
}

impl Response {
    /// Create an OK response with the given payload
    pub fn ok(payload: Vec<Bytes>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: Vec::new(),
        }
    }

    /// Create an ERROR response carrying a message
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: vec![Bytes::copy_from_slice(message.as_bytes())],
        }
    }

    /// Interpret a decoded block sequence as a response.
    ///
    /// The sequence must start with a known status block.
    pub fn from_blocks(blocks: Vec<Bytes>) -> Result<Self> {
        let mut blocks = blocks.into_iter();
        let first = blocks
            .next()
            .ok_or_else(|| SsdbError::Protocol("empty response".to_string()))?;
        let status = Status::parse(&first).ok_or_else(|| {
            SsdbError::Protocol(format!(
                "unknown response status: {:?}",
                String::from_utf8_lossy(&first)
            ))
        })?;
        Ok(Self {
            status,
            payload: blocks.collect(),
        })
    }

    /// Status block followed by payload, as sent on the wire
    pub fn to_blocks(&self) -> Vec<Bytes> {
        let mut blocks = Vec::with_capacity(self.payload.len() + 1);
        blocks.push(Bytes::from_static(self.status.as_str().as_bytes()));
        blocks.extend(self.payload.iter().cloned());
        blocks
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Status::NotFound
    }

    /// Payload of an `ok` reply; any other status becomes a command error
    pub fn into_ok(self) -> Result<Vec<Bytes>> {
        match self.status {
            Status::Ok => Ok(self.payload),
            status => Err(SsdbError::Command {
                status,
                payload: self.payload,
            }),
        }
    }
}

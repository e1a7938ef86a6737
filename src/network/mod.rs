//! Network Module
//!
//! TCP connections to the server.
//!
//! ## Architecture
//! - One socket per connection, strictly request/response (no pipelining)
//! - Read buffer kept across reads so short reads never lose framing
//! - Any framing, timeout or socket failure invalidates the connection

mod connection;
mod async_connection;

pub use connection::Connection;
pub use async_connection::AsyncConnection;

use std::io::{self, ErrorKind};

use crate::error::SsdbError;

/// Bytes requested from the socket per read
pub(crate) const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Classify a socket error raised during `op`
pub(crate) fn map_io_error(error: io::Error, op: &'static str) -> SsdbError {
    match error.kind() {
        // Unix reports an expired SO_RCVTIMEO as WouldBlock, Windows as TimedOut
        ErrorKind::WouldBlock | ErrorKind::TimedOut => SsdbError::Timeout(op),
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected => SsdbError::ConnectionClosed,
        _ => SsdbError::Io(error),
    }
}

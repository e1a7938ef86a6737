//! Blocking Connection
//!
//! Owns one TCP socket and runs one request/response exchange at a time.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::BytesMut;

use super::{map_io_error, READ_CHUNK_SIZE};
use crate::config::Config;
use crate::error::{Result, SsdbError};
use crate::protocol::{decode_frame, encode_into, Command, Response};

/// A single blocking connection to the server
pub struct Connection {
    /// Socket, `None` once closed or invalidated
    stream: Option<TcpStream>,

    /// Bytes read but not yet decoded; survives short reads
    read_buf: BytesMut,

    /// Encoded request, reused across calls
    write_buf: BytesMut,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Open a connection using the address and timeouts in `config`
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let addr = config.addr();
        let stream = connect_stream(&addr, config.connect_timeout())?;

        // Disable Nagle's algorithm, requests are small and latency bound
        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        tracing::debug!("Connected to {}", addr);
        Ok(Self::from_stream(stream, addr))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream, peer_addr: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            read_buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            write_buf: BytesMut::with_capacity(256),
            peer_addr: peer_addr.into(),
        }
    }

    /// Send a command and wait for its complete response.
    ///
    /// Any connection-level failure closes the connection; later calls fail
    /// with `ConnectionClosed`. A response carrying an error status is
    /// returned as a normal `Response`.
    pub fn execute(&mut self, command: &Command) -> Result<Response> {
        tracing::trace!(
            "Sending {} to {}",
            String::from_utf8_lossy(command.name()),
            self.peer_addr
        );

        let result = self.exchange(command);
        if let Err(ref e) = result {
            if e.is_fatal() && self.stream.is_some() {
                tracing::warn!("Dropping connection to {}: {}", self.peer_addr, e);
                self.close();
            }
        }
        result
    }

    fn exchange(&mut self, command: &Command) -> Result<Response> {
        let stream = self.stream.as_mut().ok_or(SsdbError::ConnectionClosed)?;

        if !self.read_buf.is_empty() {
            return Err(SsdbError::Protocol(format!(
                "{} unsolicited bytes buffered before request",
                self.read_buf.len()
            )));
        }

        self.write_buf.clear();
        encode_into(command, &mut self.write_buf);
        // write_all retries short writes until the whole request is out
        stream
            .write_all(&self.write_buf)
            .map_err(|e| map_io_error(e, "write"))?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(blocks) = decode_frame(&mut self.read_buf)? {
                return Response::from_blocks(blocks);
            }

            let n = match stream.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("Connection closed by {}", self.peer_addr);
                    return Err(SsdbError::ConnectionClosed);
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io_error(e, "read")),
            };
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Shut down and release the socket. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!("Closed connection to {}", self.peer_addr);
        }
        self.read_buf.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Second handle to the socket, used to interrupt a blocked call
    pub(crate) fn try_clone_stream(&self) -> Result<TcpStream> {
        let stream = self.stream.as_ref().ok_or(SsdbError::ConnectionClosed)?;
        Ok(stream.try_clone()?)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Resolve `addr` and connect to the first address that accepts
fn connect_stream(addr: &str, timeout: Option<Duration>) -> Result<TcpStream> {
    let connect_error = |source: io::Error| SsdbError::Connect {
        addr: addr.to_string(),
        source,
    };

    let mut last_error = None;
    for socket_addr in addr.to_socket_addrs().map_err(connect_error)? {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout),
            None => TcpStream::connect(socket_addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", socket_addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(connect_error(last_error.unwrap_or_else(|| {
        io::Error::new(ErrorKind::NotFound, "address resolved to nothing")
    })))
}

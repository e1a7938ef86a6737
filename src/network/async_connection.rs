//! Async Connection
//!
//! Tokio counterpart of [`Connection`](super::Connection). Suspends only
//! while the socket is not ready for the next write or read.

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{map_io_error, READ_CHUNK_SIZE};
use crate::config::Config;
use crate::error::{Result, SsdbError};
use crate::protocol::{decode_frame, encode_into, Command, Response};

/// A single async connection to the server
pub struct AsyncConnection {
    stream: Option<TcpStream>,
    read_buf: BytesMut,
    write_buf: BytesMut,

    /// Set from the first written byte until the response is decoded.
    /// Still set after a dropped `execute` future, marking the byte stream
    /// as out of step with the protocol.
    in_flight: bool,

    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    peer_addr: String,
}

impl AsyncConnection {
    /// Open a connection using the address and timeouts in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let addr = config.addr();

        let attempt = with_deadline(config.connect_timeout(), TcpStream::connect(addr.as_str()));
        let stream = match attempt.await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(SsdbError::Connect { addr, source }),
            Err(_) => {
                return Err(SsdbError::Connect {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
        };
        stream.set_nodelay(true)?;

        tracing::debug!("Connected to {}", addr);
        Ok(Self {
            stream: Some(stream),
            read_buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            write_buf: BytesMut::with_capacity(256),
            in_flight: false,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            peer_addr: addr,
        })
    }

    /// Send a command and wait for its complete response.
    ///
    /// Connection-level failures close the connection. If the returned
    /// future is dropped after the request was written, the connection stays
    /// marked in flight and must not be reused.
    pub async fn execute(&mut self, command: &Command) -> Result<Response> {
        tracing::trace!(
            "Sending {} to {}",
            String::from_utf8_lossy(command.name()),
            self.peer_addr
        );

        let result = self.exchange(command).await;
        if let Err(ref e) = result {
            if e.is_fatal() && self.stream.is_some() {
                tracing::warn!("Dropping connection to {}: {}", self.peer_addr, e);
                self.close().await;
            }
        }
        result
    }

    async fn exchange(&mut self, command: &Command) -> Result<Response> {
        if self.in_flight {
            return Err(SsdbError::Protocol(
                "previous request was abandoned before its response".to_string(),
            ));
        }
        let stream = self.stream.as_mut().ok_or(SsdbError::ConnectionClosed)?;

        if !self.read_buf.is_empty() {
            return Err(SsdbError::Protocol(format!(
                "{} unsolicited bytes buffered before request",
                self.read_buf.len()
            )));
        }

        self.write_buf.clear();
        encode_into(command, &mut self.write_buf);

        self.in_flight = true;
        match with_deadline(self.write_timeout, stream.write_all(&self.write_buf)).await {
            Ok(result) => result.map_err(|e| map_io_error(e, "write"))?,
            Err(_) => return Err(SsdbError::Timeout("write")),
        }

        loop {
            if let Some(blocks) = decode_frame(&mut self.read_buf)? {
                self.in_flight = false;
                return Response::from_blocks(blocks);
            }

            self.read_buf.reserve(READ_CHUNK_SIZE);
            let n = match with_deadline(self.read_timeout, stream.read_buf(&mut self.read_buf)).await
            {
                Ok(result) => result.map_err(|e| map_io_error(e, "read"))?,
                Err(_) => return Err(SsdbError::Timeout("read")),
            };
            if n == 0 {
                tracing::debug!("Connection closed by {}", self.peer_addr);
                return Err(SsdbError::ConnectionClosed);
            }
        }
    }

    /// Shut down and release the socket. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            tracing::debug!("Closed connection to {}", self.peer_addr);
        }
        self.read_buf.clear();
        self.in_flight = false;
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Whether a request was written without its response being read
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Run `fut` under an optional deadline; `Err` means the deadline passed
async fn with_deadline<F: Future>(
    limit: Option<Duration>,
    fut: F,
) -> std::result::Result<F::Output, tokio::time::error::Elapsed> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await,
        None => Ok(fut.await),
    }
}

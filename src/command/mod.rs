//! Command Layer
//!
//! One builder per server command. Each builder returns a [`Request`]: the
//! encoded-ready [`Command`] together with the reply parser that turns the
//! server's `Response` into the caller's type. The clients only move
//! requests over a connection; all per-command knowledge lives here.
//!
//! ## Families
//! - [`kv`]: plain keys, key ranges, multi-key operations
//! - [`hash`]: named maps of fields
//! - [`zset`]: named sets of keys with integer scores
//! - [`queue`]: named double-ended lists
//! - [`server`]: authentication and server-wide queries

pub mod reply;

pub mod kv;
pub mod hash;
pub mod zset;
pub mod queue;
pub mod server;

use std::fmt;

use crate::error::{Result, SsdbError};
use crate::protocol::{Command, CommandBuilder, Response};

/// A command paired with the parser for its reply
pub struct Request<T> {
    command: Command,
    parse: fn(Response) -> Result<T>,
}

impl<T> Request<T> {
    pub fn new(command: Command, parse: fn(Response) -> Result<T>) -> Self {
        Self { command, parse }
    }

    /// The command to send
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Interpret the response received for this request
    pub fn parse(&self, response: Response) -> Result<T> {
        (self.parse)(response)
    }
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Build a request
pub(crate) fn request<T>(
    builder: CommandBuilder,
    parse: fn(Response) -> Result<T>,
) -> Result<Request<T>> {
    Ok(Request::new(builder.build()?, parse))
}

/// Build a request that needs at least `min` arguments after the name
pub(crate) fn request_min<T>(
    builder: CommandBuilder,
    min: usize,
    parse: fn(Response) -> Result<T>,
) -> Result<Request<T>> {
    let command = builder.build()?;
    let given = command.args().len() - 1;
    if given < min {
        return Err(SsdbError::InvalidArgument(format!(
            "{} needs at least {} arguments, got {}",
            String::from_utf8_lossy(command.name()),
            min,
            given
        )));
    }
    Ok(Request::new(command, parse))
}

/// Raw request whose reply is returned undecoded
pub fn raw(command: Command) -> Request<Response> {
    Request::new(command, Ok)
}

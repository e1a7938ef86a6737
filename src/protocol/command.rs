//! Command definitions
//!
//! A command is an ordered list of byte-string arguments, the first of
//! which is the command name. Arguments enter as [`Arg`] values and are
//! coerced to bytes exactly once, when the command is built.

use bytes::Bytes;

use crate::error::{Result, SsdbError};

/// One command argument before coercion to wire bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Raw bytes, sent unchanged
    Bytes(Bytes),

    /// Text, sent as UTF-8
    Text(String),

    /// Signed integer, sent as ASCII decimal
    Int(i64),

    /// Unsigned integer, sent as ASCII decimal
    UInt(u64),

    /// Float, sent in shortest round-trip decimal form
    Float(f64),
}

impl Arg {
    /// Coerce this argument to its wire bytes.
    ///
    /// This is the only place argument types are converted. Non-finite
    /// floats have no decimal form the server can parse and are rejected.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Arg::Bytes(bytes) => Ok(bytes),
            Arg::Text(text) => Ok(Bytes::from(text.into_bytes())),
            Arg::Int(n) => Ok(Bytes::from(n.to_string())),
            Arg::UInt(n) => Ok(Bytes::from(n.to_string())),
            Arg::Float(f) if f.is_finite() => Ok(Bytes::from(f.to_string())),
            Arg::Float(f) => Err(SsdbError::InvalidArgument(format!(
                "cannot encode non-finite float {}",
                f
            ))),
        }
    }
}

impl From<Bytes> for Arg {
    fn from(value: Bytes) -> Self {
        Arg::Bytes(value)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for Arg {
    fn from(value: &[u8]) -> Self {
        Arg::Bytes(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<&[u8; N]> for Arg {
    fn from(value: &[u8; N]) -> Self {
        Arg::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<&Bytes> for Arg {
    fn from(value: &Bytes) -> Self {
        Arg::Bytes(value.clone())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Text(value.clone())
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(i64::from(value))
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Arg::UInt(value)
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::UInt(u64::from(value))
    }
}

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        Arg::UInt(value as u64)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

/// A fully coerced, immutable command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Start building a command with the given name
    pub fn builder(name: &str) -> CommandBuilder {
        CommandBuilder {
            args: vec![Arg::Text(name.to_string())],
        }
    }

    /// Build a command from already-coerced arguments.
    ///
    /// Fails if `args` is empty, since the first argument is the name.
    pub fn from_args(args: Vec<Bytes>) -> Result<Self> {
        if args.is_empty() {
            return Err(SsdbError::InvalidArgument(
                "command needs at least a name".to_string(),
            ));
        }
        Ok(Self { args })
    }

    /// Command name (first argument)
    pub fn name(&self) -> &[u8] {
        &self.args[0]
    }

    /// All arguments, name included
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Total encoded size, used to size the write buffer
    pub fn encoded_len(&self) -> usize {
        self.args
            .iter()
            .map(|arg| decimal_width(arg.len()) + arg.len() + 2)
            .sum::<usize>()
            + 1
    }
}

fn decimal_width(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

/// Collects arguments for a [`Command`]
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    args: Vec<Arg>,
}

impl CommandBuilder {
    /// Append one argument
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append every argument from an iterator
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append key/value pairs as interleaved arguments
    pub fn pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arg>,
        V: Into<Arg>,
    {
        for (key, value) in pairs {
            self.args.push(key.into());
            self.args.push(value.into());
        }
        self
    }

    /// Number of arguments collected so far, name included
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Coerce every argument and freeze the command
    pub fn build(self) -> Result<Command> {
        let args = self
            .args
            .into_iter()
            .map(Arg::into_bytes)
            .collect::<Result<Vec<_>>>()?;
        Command::from_args(args)
    }
}

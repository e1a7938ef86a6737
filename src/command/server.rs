//! Server commands

use super::{reply, request, Request};
use crate::error::Result;
use crate::protocol::{Arg, Command};

/// `auth password`
pub fn auth(password: impl Into<Arg>) -> Result<Request<()>> {
    request(Command::builder("auth").arg(password), reply::unit)
}

/// `dbsize`: approximate size of the database in bytes
pub fn dbsize() -> Result<Request<i64>> {
    request(Command::builder("dbsize"), reply::int)
}

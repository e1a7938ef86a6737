//! Hash commands

use bytes::Bytes;

use super::{reply, request, Request};
use crate::error::Result;
use crate::protocol::{Arg, Command};

/// `hset name key value`: true if the field is new
pub fn hset(name: impl Into<Arg>, key: impl Into<Arg>, value: impl Into<Arg>) -> Result<Request<bool>> {
    request(
        Command::builder("hset").arg(name).arg(key).arg(value),
        reply::flag,
    )
}

/// `hget name key`: the field's value, `not_found` becomes `None`
pub fn hget(name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Request<Option<Bytes>>> {
    request(
        Command::builder("hget").arg(name).arg(key),
        reply::optional_bytes,
    )
}

/// `hdel name key`: true if the field existed
pub fn hdel(name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Request<bool>> {
    request(Command::builder("hdel").arg(name).arg(key), reply::flag)
}

/// `hincr name key by`: field value after the increment
pub fn hincr(name: impl Into<Arg>, key: impl Into<Arg>, by: i64) -> Result<Request<i64>> {
    request(
        Command::builder("hincr").arg(name).arg(key).arg(by),
        reply::int,
    )
}

/// `hexists name key`
pub fn hexists(name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Request<bool>> {
    request(Command::builder("hexists").arg(name).arg(key), reply::flag)
}

/// `hsize name`: number of fields
pub fn hsize(name: impl Into<Arg>) -> Result<Request<i64>> {
    request(Command::builder("hsize").arg(name), reply::int)
}

/// `hgetall name`: flattened field/value blocks in server order
pub fn hgetall(name: impl Into<Arg>) -> Result<Request<Vec<Bytes>>> {
    request(Command::builder("hgetall").arg(name), reply::list)
}

/// `hkeys name start end limit`: field names in `(start, end]`
pub fn hkeys(
    name: impl Into<Arg>,
    start: impl Into<Arg>,
    end: impl Into<Arg>,
    limit: u64,
) -> Result<Request<Vec<Bytes>>> {
    request(
        Command::builder("hkeys").arg(name).arg(start).arg(end).arg(limit),
        reply::list,
    )
}

/// `hclear name`: number of fields removed
pub fn hclear(name: impl Into<Arg>) -> Result<Request<i64>> {
    request(Command::builder("hclear").arg(name), reply::int)
}

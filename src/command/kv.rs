//! Key-value commands
//!
//! Plain keys, key range scans and multi-key variants.

use bytes::Bytes;

use super::{reply, request, request_min, Request};
use crate::error::Result;
use crate::protocol::{Arg, Command};

/// `set key value`
pub fn set(key: impl Into<Arg>, value: impl Into<Arg>) -> Result<Request<()>> {
    request(Command::builder("set").arg(key).arg(value), reply::unit)
}

/// `setx key value ttl`: set with expiry in seconds
pub fn setx(key: impl Into<Arg>, value: impl Into<Arg>, ttl_secs: u64) -> Result<Request<()>> {
    request(
        Command::builder("setx").arg(key).arg(value).arg(ttl_secs),
        reply::unit,
    )
}

/// `setnx key value`: true if the key was created
pub fn setnx(key: impl Into<Arg>, value: impl Into<Arg>) -> Result<Request<bool>> {
    request(Command::builder("setnx").arg(key).arg(value), reply::flag)
}

/// `get key`
pub fn get(key: impl Into<Arg>) -> Result<Request<Option<Bytes>>> {
    request(Command::builder("get").arg(key), reply::optional_bytes)
}

/// `getset key value`: previous value, if any
pub fn getset(key: impl Into<Arg>, value: impl Into<Arg>) -> Result<Request<Option<Bytes>>> {
    request(
        Command::builder("getset").arg(key).arg(value),
        reply::optional_bytes,
    )
}

/// `del key`
pub fn del(key: impl Into<Arg>) -> Result<Request<()>> {
    request(Command::builder("del").arg(key), reply::unit)
}

/// `incr key by`: value after the increment
pub fn incr(key: impl Into<Arg>, by: i64) -> Result<Request<i64>> {
    request(Command::builder("incr").arg(key).arg(by), reply::int)
}

/// `exists key`
pub fn exists(key: impl Into<Arg>) -> Result<Request<bool>> {
    request(Command::builder("exists").arg(key), reply::flag)
}

/// `expire key ttl`: true if the key exists
pub fn expire(key: impl Into<Arg>, ttl_secs: u64) -> Result<Request<bool>> {
    request(Command::builder("expire").arg(key).arg(ttl_secs), reply::flag)
}

/// `ttl key`
pub fn ttl(key: impl Into<Arg>) -> Result<Request<Option<std::time::Duration>>> {
    request(Command::builder("ttl").arg(key), reply::ttl)
}

/// `keys start end limit`: keys in `(start, end]`, empty bounds are open
pub fn keys(start: impl Into<Arg>, end: impl Into<Arg>, limit: u64) -> Result<Request<Vec<Bytes>>> {
    request(
        Command::builder("keys").arg(start).arg(end).arg(limit),
        reply::list,
    )
}

/// `scan start end limit`: key/value pairs in `(start, end]`
pub fn scan(
    start: impl Into<Arg>,
    end: impl Into<Arg>,
    limit: u64,
) -> Result<Request<Vec<(Bytes, Bytes)>>> {
    request(
        Command::builder("scan").arg(start).arg(end).arg(limit),
        reply::pairs,
    )
}

/// `multi_set k1 v1 k2 v2 ...`: number of keys written
pub fn multi_set<I, K, V>(pairs: I) -> Result<Request<i64>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Arg>,
    V: Into<Arg>,
{
    request_min(Command::builder("multi_set").pairs(pairs), 2, reply::int)
}

/// `multi_get k1 k2 ...`: interleaved key/value blocks for keys that exist
pub fn multi_get<I>(keys: I) -> Result<Request<Vec<Bytes>>>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    request_min(Command::builder("multi_get").args(keys), 1, reply::list)
}

/// `multi_del k1 k2 ...`: number of keys deleted
pub fn multi_del<I>(keys: I) -> Result<Request<i64>>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    request_min(Command::builder("multi_del").args(keys), 1, reply::int)
}

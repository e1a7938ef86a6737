//! Sorted set commands
//!
//! Scores are 64-bit integers on the server. They travel as decimal blocks
//! and are always parsed before reaching the caller, except inside the
//! interleaved `multi_zget` reply which mirrors the server's layout.

use bytes::Bytes;

use super::{reply, request, request_min, Request};
use crate::error::Result;
use crate::protocol::{Arg, Command};

/// `zset name key score`: true if the key is new
pub fn zset(name: impl Into<Arg>, key: impl Into<Arg>, score: i64) -> Result<Request<bool>> {
    request(
        Command::builder("zset").arg(name).arg(key).arg(score),
        reply::flag,
    )
}

/// `zget name key`: the key's score
pub fn zget(name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Request<Option<i64>>> {
    request(
        Command::builder("zget").arg(name).arg(key),
        reply::optional_int,
    )
}

/// `zdel name key`: true if the key existed
pub fn zdel(name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Request<bool>> {
    request(Command::builder("zdel").arg(name).arg(key), reply::flag)
}

/// `zincr name key by`: score after the increment
pub fn zincr(name: impl Into<Arg>, key: impl Into<Arg>, by: i64) -> Result<Request<i64>> {
    request(
        Command::builder("zincr").arg(name).arg(key).arg(by),
        reply::int,
    )
}

/// `zexists name key`
pub fn zexists(name: impl Into<Arg>, key: impl Into<Arg>) -> Result<Request<bool>> {
    request(Command::builder("zexists").arg(name).arg(key), reply::flag)
}

/// `zsize name`: number of keys
pub fn zsize(name: impl Into<Arg>) -> Result<Request<i64>> {
    request(Command::builder("zsize").arg(name), reply::int)
}

/// `zrange name offset limit`: keys with scores in ascending score order
pub fn zrange(name: impl Into<Arg>, offset: u64, limit: u64) -> Result<Request<Vec<(Bytes, i64)>>> {
    request(
        Command::builder("zrange").arg(name).arg(offset).arg(limit),
        reply::scored,
    )
}

/// `zclear name`: number of keys removed
pub fn zclear(name: impl Into<Arg>) -> Result<Request<i64>> {
    request(Command::builder("zclear").arg(name), reply::int)
}

/// `multi_zset name k1 s1 k2 s2 ...`: number of keys written
pub fn multi_zset<I, K>(name: impl Into<Arg>, pairs: I) -> Result<Request<i64>>
where
    I: IntoIterator<Item = (K, i64)>,
    K: Into<Arg>,
{
    request_min(
        Command::builder("multi_zset").arg(name).pairs(pairs),
        3,
        reply::int,
    )
}

/// `multi_zget name k1 k2 ...`: interleaved key/score blocks
pub fn multi_zget<I>(name: impl Into<Arg>, keys: I) -> Result<Request<Vec<Bytes>>>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    request_min(
        Command::builder("multi_zget").arg(name).args(keys),
        2,
        reply::list,
    )
}

/// `multi_zdel name k1 k2 ...`: number of keys deleted
pub fn multi_zdel<I>(name: impl Into<Arg>, keys: I) -> Result<Request<i64>>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    request_min(
        Command::builder("multi_zdel").arg(name).args(keys),
        2,
        reply::int,
    )
}

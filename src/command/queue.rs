//! Queue commands
//!
//! Pushing several items to the front reverses them: after
//! `qpush_front q a b c` the queue reads `c b a` from the front.

use bytes::Bytes;

use super::{reply, request, request_min, Request};
use crate::error::Result;
use crate::protocol::{Arg, Command};

/// `qpush_front name item...`: queue size after the push
pub fn qpush_front<I>(name: impl Into<Arg>, items: I) -> Result<Request<i64>>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    request_min(
        Command::builder("qpush_front").arg(name).args(items),
        2,
        reply::int,
    )
}

/// `qpush_back name item...`: queue size after the push
pub fn qpush_back<I>(name: impl Into<Arg>, items: I) -> Result<Request<i64>>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    request_min(
        Command::builder("qpush_back").arg(name).args(items),
        2,
        reply::int,
    )
}

/// `qpop_front name count`: up to `count` items in pop order
pub fn qpop_front(name: impl Into<Arg>, count: u64) -> Result<Request<Vec<Bytes>>> {
    request(
        Command::builder("qpop_front").arg(name).arg(count),
        reply::popped,
    )
}

/// `qpop_back name count`: up to `count` items in pop order
pub fn qpop_back(name: impl Into<Arg>, count: u64) -> Result<Request<Vec<Bytes>>> {
    request(
        Command::builder("qpop_back").arg(name).arg(count),
        reply::popped,
    )
}

/// `qsize name`: number of items
pub fn qsize(name: impl Into<Arg>) -> Result<Request<i64>> {
    request(Command::builder("qsize").arg(name), reply::int)
}

/// `qfront name`: first item, `not_found` becomes `None`
pub fn qfront(name: impl Into<Arg>) -> Result<Request<Option<Bytes>>> {
    request(Command::builder("qfront").arg(name), reply::optional_bytes)
}

/// `qback name`: last item, `not_found` becomes `None`
pub fn qback(name: impl Into<Arg>) -> Result<Request<Option<Bytes>>> {
    request(Command::builder("qback").arg(name), reply::optional_bytes)
}

/// `qget name index`: item at `index`, negative counts from the back
pub fn qget(name: impl Into<Arg>, index: i64) -> Result<Request<Option<Bytes>>> {
    request(
        Command::builder("qget").arg(name).arg(index),
        reply::optional_bytes,
    )
}

/// `qrange name offset limit`
pub fn qrange(name: impl Into<Arg>, offset: i64, limit: u64) -> Result<Request<Vec<Bytes>>> {
    request(
        Command::builder("qrange").arg(name).arg(offset).arg(limit),
        reply::list,
    )
}

/// `qclear name`: number of items removed
pub fn qclear(name: impl Into<Arg>) -> Result<Request<i64>> {
    request(Command::builder("qclear").arg(name), reply::int)
}

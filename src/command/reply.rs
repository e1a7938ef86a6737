//! Reply parsers
//!
//! Every command picks one of these to turn its `Response` into a typed
//! value. Numeric blocks are only ever parsed through [`parse_int`], so
//! counts and scores come back as `i64` from every command.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, SsdbError};
use crate::protocol::Response;

/// Parse a decimal integer block sent by the server
pub fn parse_int(block: &[u8]) -> Result<i64> {
    std::str::from_utf8(block)
        .ok()
        .and_then(|text| text.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            SsdbError::UnexpectedResponse(format!(
                "expected integer, got {:?}",
                String::from_utf8_lossy(block)
            ))
        })
}

fn first(payload: Vec<Bytes>) -> Result<Bytes> {
    payload
        .into_iter()
        .next()
        .ok_or_else(|| SsdbError::UnexpectedResponse("missing reply value".to_string()))
}

/// `ok` with no meaningful payload
pub fn unit(response: Response) -> Result<()> {
    response.into_ok().map(|_| ())
}

/// `ok` followed by one integer
pub fn int(response: Response) -> Result<i64> {
    parse_int(&first(response.into_ok()?)?)
}

/// `ok` followed by `1` or `0`
pub fn flag(response: Response) -> Result<bool> {
    Ok(int(response)? != 0)
}

/// Opaque value, `not_found` meaning absent
pub fn optional_bytes(response: Response) -> Result<Option<Bytes>> {
    if response.is_not_found() {
        return Ok(None);
    }
    first(response.into_ok()?).map(Some)
}

/// Integer value, `not_found` meaning absent
pub fn optional_int(response: Response) -> Result<Option<i64>> {
    if response.is_not_found() {
        return Ok(None);
    }
    parse_int(&first(response.into_ok()?)?).map(Some)
}

/// Payload blocks as-is
pub fn list(response: Response) -> Result<Vec<Bytes>> {
    response.into_ok()
}

/// Popped queue items; an empty queue may answer `not_found`
pub fn popped(response: Response) -> Result<Vec<Bytes>> {
    if response.is_not_found() {
        return Ok(Vec::new());
    }
    response.into_ok()
}

/// Interleaved key/value blocks
pub fn pairs(response: Response) -> Result<Vec<(Bytes, Bytes)>> {
    let payload = even(response.into_ok()?)?;
    let mut out = Vec::with_capacity(payload.len() / 2);
    let mut blocks = payload.into_iter();
    while let (Some(key), Some(value)) = (blocks.next(), blocks.next()) {
        out.push((key, value));
    }
    Ok(out)
}

/// Interleaved key/score blocks
pub fn scored(response: Response) -> Result<Vec<(Bytes, i64)>> {
    pairs(response)?
        .into_iter()
        .map(|(key, score)| -> Result<(Bytes, i64)> { Ok((key, parse_int(&score)?)) })
        .collect()
}

/// Remaining time to live; negative or `not_found` means none
pub fn ttl(response: Response) -> Result<Option<Duration>> {
    match optional_int(response)? {
        Some(secs) if secs >= 0 => Ok(Some(Duration::from_secs(secs as u64))),
        _ => Ok(None),
    }
}

fn even(payload: Vec<Bytes>) -> Result<Vec<Bytes>> {
    if payload.len() % 2 != 0 {
        return Err(SsdbError::UnexpectedResponse(format!(
            "expected key/value pairs, got {} blocks",
            payload.len()
        )));
    }
    Ok(payload)
}

//! Protocol codec
//!
//! Encoding and decoding functions for the block wire format.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────┬────┬─────────────┬────┐
//! │ len (ASCII)  │ \n │ len bytes   │ \n │   repeated once per block
//! └──────────────┴────┴─────────────┴────┘
//! ┌────┐
//! │ \n │                                      empty line ends the sequence
//! └────┘
//! ```
//!
//! Requests and responses share this framing. The decoder is a pure
//! function of the bytes it is handed: it either finds a complete sequence
//! and reports how many bytes it used, or reports that more input is needed.
//! A `\r` directly before a framing `\n` is accepted.

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use super::{Command, Response};
use crate::error::{Result, SsdbError};

/// Maximum size of a single block (256 MB)
pub const MAX_BLOCK_SIZE: usize = 256 * 1024 * 1024;

/// Longest length line accepted, enough digits for MAX_BLOCK_SIZE plus `\r`
const MAX_LENGTH_LINE: usize = 10;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> BytesMut {
    let mut buf = BytesMut::with_capacity(command.encoded_len());
    encode_into(command, &mut buf);
    buf
}

/// Append the encoding of a command to `buf`
pub fn encode_into(command: &Command, buf: &mut BytesMut) {
    buf.reserve(command.encoded_len());
    encode_blocks(command.args(), buf);
}

/// Append any block sequence, terminator included, to `buf`
pub fn encode_blocks<B: AsRef<[u8]>>(blocks: &[B], buf: &mut BytesMut) {
    for block in blocks {
        let block = block.as_ref();
        push_decimal(buf, block.len());
        buf.put_u8(b'\n');
        buf.put_slice(block);
        buf.put_u8(b'\n');
    }
    buf.put_u8(b'\n');
}

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> BytesMut {
    let mut buf = BytesMut::new();
    encode_blocks(&response.to_blocks(), &mut buf);
    buf
}

fn push_decimal(buf: &mut BytesMut, mut value: usize) {
    // Digits are produced in reverse into a stack buffer.
    let mut digits = [0u8; 20];
    let mut len = 0;
    loop {
        digits[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
        if value == 0 {
            break;
        }
    }
    for idx in (0..len).rev() {
        buf.put_u8(digits[idx]);
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one block sequence from the start of `buf`.
///
/// Returns the blocks and the number of bytes consumed, or `None` if `buf`
/// ends before the terminating empty line.
pub fn decode_blocks(buf: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>> {
    Ok(scan(buf)?.map(|(spans, consumed)| {
        let blocks = spans
            .into_iter()
            .map(|span| Bytes::copy_from_slice(&buf[span]))
            .collect();
        (blocks, consumed)
    }))
}

/// Decode one response from the start of `buf`
pub fn decode_response(buf: &[u8]) -> Result<Option<(Response, usize)>> {
    match decode_blocks(buf)? {
        Some((blocks, consumed)) => Ok(Some((Response::from_blocks(blocks)?, consumed))),
        None => Ok(None),
    }
}

/// Decode one block sequence and remove it from `buf`.
///
/// The returned blocks share the buffer's allocation. `buf` is left
/// untouched when the sequence is incomplete.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>> {
    match scan(buf)? {
        Some((spans, consumed)) => {
            let frame = buf.split_to(consumed).freeze();
            Ok(Some(spans.into_iter().map(|span| frame.slice(span)).collect()))
        }
        None => Ok(None),
    }
}

/// Locate every block of the first complete sequence in `buf`
fn scan(buf: &[u8]) -> Result<Option<(Vec<Range<usize>>, usize)>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    loop {
        let newline = match buf[pos..].iter().position(|&b| b == b'\n') {
            Some(offset) => pos + offset,
            None => {
                check_partial_length(&buf[pos..])?;
                return Ok(None);
            }
        };

        let line = strip_cr(&buf[pos..newline]);
        if line.is_empty() {
            return Ok(Some((spans, newline + 1)));
        }

        let len = parse_length(line)?;
        let start = newline + 1;
        let end = start + len;

        // Payload plus at least its trailing newline must be present.
        if buf.len() <= end {
            return Ok(None);
        }
        pos = match buf[end] {
            b'\n' => end + 1,
            b'\r' if buf.len() == end + 1 => return Ok(None),
            b'\r' if buf[end + 1] == b'\n' => end + 2,
            other => {
                return Err(SsdbError::Protocol(format!(
                    "expected newline after {} byte block, found 0x{:02x}",
                    len, other
                )))
            }
        };
        spans.push(start..end);
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((b'\r', rest)) => rest,
        _ => line,
    }
}

/// Parse a block length line
fn parse_length(line: &[u8]) -> Result<usize> {
    if line.len() > MAX_LENGTH_LINE {
        return Err(SsdbError::Protocol(format!(
            "block length line too long ({} bytes)",
            line.len()
        )));
    }

    let mut len: u64 = 0;
    for &b in line {
        if !b.is_ascii_digit() {
            return Err(SsdbError::Protocol(format!(
                "invalid block length: {:?}",
                String::from_utf8_lossy(line)
            )));
        }
        len = len * 10 + u64::from(b - b'0');
    }

    if len > MAX_BLOCK_SIZE as u64 {
        return Err(SsdbError::Protocol(format!(
            "block too large: {} bytes (max {})",
            len, MAX_BLOCK_SIZE
        )));
    }
    Ok(len as usize)
}

/// Reject an unterminated length line that can never become valid
fn check_partial_length(tail: &[u8]) -> Result<()> {
    let digits = strip_cr(tail);
    if tail.len() > MAX_LENGTH_LINE + 1 || !digits.iter().all(u8::is_ascii_digit) {
        return Err(SsdbError::Protocol(format!(
            "invalid block length: {:?}",
            String::from_utf8_lossy(tail)
        )));
    }
    Ok(())
}

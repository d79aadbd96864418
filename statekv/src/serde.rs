//! Key encoding and decoding for ledger state.
//!
//! Plain keys are stored as their UTF-8 bytes and may not contain `0x00`.
//! Composite keys live in their own namespace, marked by a leading `0x00`,
//! so they can never collide with a plain key:
//!
//! ```text
//! composite key: | 0x00 | part(object_type) | part(attr_1) | ... | part(attr_n) |
//! part(s):       | escaped bytes of s | 0x00 |
//! ```
//!
//! Inside a part, `0x00` is written as `0x01 0x01` and `0x01` as `0x01 0x02`;
//! every other byte is copied unchanged. Because each part ends with the
//! lowest byte value, encoding an attribute prefix yields a byte prefix of
//! the encoding of every longer attribute list that extends it, and keys of
//! one object type sort by their attribute lists.

use std::ops::Bound::{Excluded, Included, Unbounded};

use bytes::{BufMut, Bytes, BytesMut};
use common::BytesRange;

use crate::error::{Error, Result};

/// First byte of every composite key.
pub const COMPOSITE_KEY_NAMESPACE: u8 = 0x00;

/// Terminates each part of a composite key.
const TERMINATOR_BYTE: u8 = 0x00;

/// Introduces an escaped `0x00` or `0x01` inside a part.
const ESCAPE_BYTE: u8 = 0x01;

/// Value written under every index entry.
pub const INDEX_SENTINEL: &[u8] = &[0x00];

/// Lowest possible plain key. Range scans with an empty start key begin
/// here, which skips the whole composite namespace.
const MIN_PLAIN_KEY: &[u8] = &[0x01];

fn put_part(buf: &mut BytesMut, part: &str) {
    for &byte in part.as_bytes() {
        match byte {
            TERMINATOR_BYTE => {
                buf.put_u8(ESCAPE_BYTE);
                buf.put_u8(0x01);
            }
            ESCAPE_BYTE => {
                buf.put_u8(ESCAPE_BYTE);
                buf.put_u8(0x02);
            }
            _ => buf.put_u8(byte),
        }
    }
    buf.put_u8(TERMINATOR_BYTE);
}

/// Reads one part and advances `buf` past its terminator.
fn take_part(buf: &mut &[u8]) -> Result<String> {
    let mut part = Vec::new();
    let mut i = 0;

    while i < buf.len() {
        match buf[i] {
            TERMINATOR_BYTE => {
                *buf = &buf[i + 1..];
                return String::from_utf8(part)
                    .map_err(|e| Error::MalformedKey(format!("part is not valid UTF-8: {}", e)));
            }
            ESCAPE_BYTE => {
                match buf.get(i + 1) {
                    Some(0x01) => part.push(TERMINATOR_BYTE),
                    Some(0x02) => part.push(ESCAPE_BYTE),
                    Some(other) => {
                        return Err(Error::MalformedKey(format!(
                            "invalid escape sequence: 0x01 0x{:02x}",
                            other
                        )));
                    }
                    None => {
                        return Err(Error::MalformedKey(
                            "truncated escape sequence".to_string(),
                        ));
                    }
                }
                i += 2;
            }
            byte => {
                part.push(byte);
                i += 1;
            }
        }
    }

    Err(Error::MalformedKey(
        "unterminated part (missing 0x00 terminator)".to_string(),
    ))
}

/// Encodes an object type and a non-empty attribute list into a composite key.
pub fn encode_composite_key(object_type: &str, attributes: &[String]) -> Result<Bytes> {
    if attributes.is_empty() {
        return Err(Error::InvalidInput(format!(
            "composite key for object type '{}' needs at least one attribute",
            object_type
        )));
    }
    Ok(encode_partial_composite_key(object_type, attributes))
}

/// Encodes an object type and a possibly empty attribute prefix.
///
/// The result is a byte prefix of every composite key of `object_type`
/// whose attributes start with `attributes`.
pub fn encode_partial_composite_key(object_type: &str, attributes: &[String]) -> Bytes {
    let len = 1
        + object_type.len()
        + 1
        + attributes.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut buf = BytesMut::with_capacity(len);
    buf.put_u8(COMPOSITE_KEY_NAMESPACE);
    put_part(&mut buf, object_type);
    for attribute in attributes {
        put_part(&mut buf, attribute);
    }
    buf.freeze()
}

/// Splits a composite key into its object type and attributes.
pub fn decode_composite_key(key: &[u8]) -> Result<(String, Vec<String>)> {
    let mut buf = match key.split_first() {
        Some((&COMPOSITE_KEY_NAMESPACE, rest)) => rest,
        Some(_) => {
            return Err(Error::MalformedKey(format!(
                "key {:?} is not in the composite key namespace",
                String::from_utf8_lossy(key)
            )));
        }
        None => return Err(Error::MalformedKey("empty key".to_string())),
    };

    let object_type = take_part(&mut buf)?;
    let mut attributes = Vec::new();
    while !buf.is_empty() {
        attributes.push(take_part(&mut buf)?);
    }
    Ok((object_type, attributes))
}

/// Range covering every composite key of `object_type` whose attributes
/// start with `attributes`.
///
/// The encoded prefix ends with a `0x00` terminator, so the exclusive upper
/// bound is the same prefix with that byte raised to `0x01`.
pub fn partial_composite_key_range(object_type: &str, attributes: &[String]) -> BytesRange {
    BytesRange::prefix(encode_partial_composite_key(object_type, attributes))
}

/// Validates and encodes a plain key.
pub fn encode_plain_key(key: &str) -> Result<Bytes> {
    if key.is_empty() {
        return Err(Error::InvalidInput(
            "key must not be an empty string".to_string(),
        ));
    }
    if key.as_bytes().contains(&COMPOSITE_KEY_NAMESPACE) {
        return Err(Error::InvalidInput(format!(
            "key {:?} contains a null character, which is reserved for composite keys",
            key
        )));
    }
    Ok(Bytes::copy_from_slice(key.as_bytes()))
}

/// Range `[start, end)` over plain keys.
///
/// An empty `start` begins at the first plain key and an empty `end` leaves
/// the range unbounded above; composite keys are never included.
pub fn plain_key_range(start: &str, end: &str) -> Result<BytesRange> {
    let start = if start.is_empty() {
        Bytes::from_static(MIN_PLAIN_KEY)
    } else {
        encode_plain_key(start)?
    };
    let end = if end.is_empty() {
        Unbounded
    } else {
        Excluded(encode_plain_key(end)?)
    };
    Ok(BytesRange::new(Included(start), end))
}

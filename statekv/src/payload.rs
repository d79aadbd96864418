//! JSON payloads exchanged with callers.
//!
//! Results are a JSON array followed by a single `\n`. Bulk inputs are JSON
//! arrays that must decode completely before any item is written.

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;
use crate::model::{CompositeKey, KeyValuePair, StateEntry};

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    Ok(Bytes::from(buf))
}

/// Encodes entries as `[{"Key":..,"Value":..},...]\n`.
///
/// Keys and values that are not valid UTF-8 are converted lossily.
pub fn encode_entries(entries: &[StateEntry]) -> Result<Bytes> {
    let pairs: Vec<KeyValuePair> = entries.iter().map(KeyValuePair::from).collect();
    to_payload(&pairs)
}

/// Encodes attribute lists as `[["a","b"],...]\n`.
pub fn encode_attribute_lists(lists: &[Vec<String>]) -> Result<Bytes> {
    to_payload(lists)
}

/// Decodes a `bulkPut` payload.
pub fn decode_bulk_records(payload: &[u8]) -> Result<Vec<KeyValuePair>> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decodes a `bulkCreateCompositeKey` payload.
pub fn decode_bulk_composite_keys(payload: &[u8]) -> Result<Vec<CompositeKey>> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decodes an attribute prefix argument such as `["U","Q2"]`.
pub fn decode_attribute_list(payload: &[u8]) -> Result<Vec<String>> {
    Ok(serde_json::from_slice(payload)?)
}

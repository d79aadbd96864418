//! Data types for StateKV operations.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A key-value entry produced by scans and queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    pub key: Bytes,
    pub value: Bytes,
}

impl StateEntry {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The JSON form of a key-value pair, used both for scan results and for
/// `bulkPut` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    #[serde(rename = "Key", alias = "key")]
    pub key: String,
    #[serde(rename = "Value", alias = "value")]
    pub value: String,
}

impl From<&StateEntry> for KeyValuePair {
    fn from(entry: &StateEntry) -> Self {
        Self {
            key: String::from_utf8_lossy(&entry.key).into_owned(),
            value: String::from_utf8_lossy(&entry.value).into_owned(),
        }
    }
}

/// An object type and the ordered attributes of one index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeKey {
    #[serde(rename = "ObjectType", alias = "objectType")]
    pub object_type: String,
    #[serde(rename = "Attributes", alias = "attributes")]
    pub attributes: Vec<String>,
}

impl CompositeKey {
    pub fn new(object_type: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            object_type: object_type.into(),
            attributes,
        }
    }
}

/// Entries collected by a scan, plus the number of index entries that were
/// passed over because they could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome<T> {
    pub entries: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for ScanOutcome<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            skipped: 0,
        }
    }
}

//! StateKV - Ledger state access over an ordered key-value store.
//!
//! StateKV stores plain key-value records and secondary indexes built from
//! composite keys, and exposes them through a small set of named operations.
//!
//! # Key Concepts
//!
//! - **Plain keys**: non-empty keys without NUL bytes, holding caller values.
//! - **Composite keys**: an object type plus an ordered attribute list,
//!   encoded so that an attribute prefix is also a byte prefix. Each one is
//!   stored as an index entry whose value is a single `0x00` byte.
//! - **Partial composite key scans**: find every index entry sharing an
//!   object type and attribute prefix, then either resolve the plain key
//!   named by the last attribute or return the attribute lists.
//! - **Invoke**: [`StateDb::invoke`] runs an operation by name with string
//!   arguments and returns a [`Response`] carrying a JSON payload.
//!
//! # Example
//!
//! ```ignore
//! use statekv::{Config, StateDb};
//!
//! let db = StateDb::open(Config::default()).await?;
//!
//! db.invoke("put", &["key01".into(), "value01".into()]).await;
//! let response = db.invoke("scan", &["key01".into(), "key02".into()]).await;
//! assert_eq!(response.payload, "[{\"Key\":\"key01\",\"Value\":\"value01\"}]\n");
//! ```

mod config;
mod dispatch;
mod error;
mod model;
mod payload;
mod query;
mod scan;
mod serde;
mod statekv;
mod storage;

pub use config::{Config, WriteOptions};
pub use dispatch::{Operation, Response, Status};
pub use error::{Error, Result};
pub use model::{CompositeKey, KeyValuePair, ScanOutcome, StateEntry};
pub use payload::{
    decode_attribute_list, decode_bulk_composite_keys, decode_bulk_records,
    encode_attribute_lists, encode_entries,
};
pub use query::{QueryEngine, SelectorQueryEngine};
pub use crate::serde::{decode_composite_key, encode_composite_key};
pub use statekv::StateDb;
pub use storage::StateIterator;

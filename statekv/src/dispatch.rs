//! Named-operation entry point.
//!
//! [`StateDb::invoke`](crate::StateDb::invoke) parses an operation name into
//! an [`Operation`], checks the argument count, runs the operation and wraps
//! the outcome in a [`Response`].

use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};
use crate::payload::{
    decode_attribute_list, decode_bulk_composite_keys, decode_bulk_records,
    encode_attribute_lists, encode_entries,
};
use crate::statekv::StateDb;

/// Operations reachable through [`StateDb::invoke`](crate::StateDb::invoke).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Put,
    Get,
    Delete,
    BulkPut,
    BulkCreateCompositeKey,
    Scan,
    ScanByPartialCompositeKey,
    ScanByPartialCompositeKeyForAttributes,
    Query,
    /// Any name not listed above.
    Unknown(String),
}

impl Operation {
    /// Names of every known operation, in dispatch order.
    pub const NAMES: [&'static str; 9] = [
        "put",
        "get",
        "delete",
        "bulkPut",
        "bulkCreateCompositeKey",
        "scan",
        "scanByPartialCompositeKey",
        "scanByPartialCompositeKeyForAttributes",
        "query",
    ];

    pub fn parse(name: &str) -> Self {
        match name {
            "put" => Operation::Put,
            "get" => Operation::Get,
            "delete" => Operation::Delete,
            "bulkPut" => Operation::BulkPut,
            "bulkCreateCompositeKey" => Operation::BulkCreateCompositeKey,
            "scan" => Operation::Scan,
            "scanByPartialCompositeKey" => Operation::ScanByPartialCompositeKey,
            "scanByPartialCompositeKeyForAttributes" => {
                Operation::ScanByPartialCompositeKeyForAttributes
            }
            "query" => Operation::Query,
            other => Operation::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::BulkPut => "bulkPut",
            Operation::BulkCreateCompositeKey => "bulkCreateCompositeKey",
            Operation::Scan => "scan",
            Operation::ScanByPartialCompositeKey => "scanByPartialCompositeKey",
            Operation::ScanByPartialCompositeKeyForAttributes => {
                "scanByPartialCompositeKeyForAttributes"
            }
            Operation::Query => "query",
            Operation::Unknown(name) => name,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Operation::Put
            | Operation::Scan
            | Operation::ScanByPartialCompositeKey
            | Operation::ScanByPartialCompositeKeyForAttributes => 2,
            Operation::Get
            | Operation::Delete
            | Operation::BulkPut
            | Operation::BulkCreateCompositeKey
            | Operation::Query => 1,
            Operation::Unknown(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

/// Outcome of an invocation: success with a payload, or failure with a
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub message: String,
    pub payload: Bytes,
}

impl Response {
    pub fn success(payload: Bytes) -> Self {
        Self {
            status: Status::Success,
            message: String::new(),
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            payload: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl From<Result<Bytes>> for Response {
    fn from(result: Result<Bytes>) -> Self {
        match result {
            Ok(payload) => Response::success(payload),
            Err(err) => Response::error(err.to_string()),
        }
    }
}

/// Runs `operation` against `db` and returns its payload.
pub(crate) async fn dispatch(db: &StateDb, operation: &Operation, args: &[String]) -> Result<Bytes> {
    if let Operation::Unknown(name) = operation {
        return Err(Error::UnknownOperation(name.clone()));
    }
    if args.len() != operation.arity() {
        return Err(Error::InvalidInput(format!(
            "Incorrect number of arguments. Expecting {}",
            operation.arity()
        )));
    }

    match operation {
        Operation::Put => {
            db.put(&args[0], Bytes::from(args[1].clone())).await?;
            Ok(Bytes::new())
        }
        Operation::Get => match db.get(&args[0]).await? {
            Some(value) => Ok(value),
            None => Err(Error::NotFound(args[0].clone())),
        },
        Operation::Delete => {
            db.delete(&args[0]).await?;
            Ok(Bytes::new())
        }
        Operation::BulkPut => {
            let records = decode_bulk_records(args[0].as_bytes())?;
            db.bulk_put(&records).await?;
            Ok(Bytes::new())
        }
        Operation::BulkCreateCompositeKey => {
            let keys = decode_bulk_composite_keys(args[0].as_bytes())?;
            db.bulk_create_composite_keys(&keys).await?;
            Ok(Bytes::new())
        }
        Operation::Scan => {
            let entries = db.scan(&args[0], &args[1]).await?;
            encode_entries(&entries)
        }
        Operation::ScanByPartialCompositeKey => {
            let attributes = decode_attribute_list(args[1].as_bytes())?;
            let outcome = db
                .scan_by_partial_composite_key(&args[0], &attributes)
                .await?;
            debug!(skipped = outcome.skipped, "resolved partial composite key scan");
            encode_entries(&outcome.entries)
        }
        Operation::ScanByPartialCompositeKeyForAttributes => {
            let attributes = decode_attribute_list(args[1].as_bytes())?;
            let outcome = db
                .scan_by_partial_composite_key_for_attributes(&args[0], &attributes)
                .await?;
            debug!(skipped = outcome.skipped, "attribute partial composite key scan");
            encode_attribute_lists(&outcome.entries)
        }
        Operation::Query => {
            let entries = db.query(&args[0]).await?;
            encode_entries(&entries)
        }
        Operation::Unknown(name) => Err(Error::UnknownOperation(name.clone())),
    }
}

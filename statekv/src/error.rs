//! Error types for StateKV operations.

use common::StorageError;

/// Error type for StateKV operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The underlying store failed to read, write or iterate.
    Storage(String),

    /// A request payload was not valid JSON of the expected shape.
    MalformedPayload(String),

    /// A key could not be decoded as a composite key.
    MalformedKey(String),

    /// Some items of a bulk operation failed. The remaining items were
    /// written and stay written.
    PartialBatch {
        operation: &'static str,
        failed: usize,
        total: usize,
    },

    /// Invalid arguments, keys or attributes.
    InvalidInput(String),

    /// The requested key holds no value.
    NotFound(String),

    /// The rich-query collaborator failed.
    Query(String),

    /// The dispatcher was asked for an operation it does not know.
    UnknownOperation(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            Error::MalformedKey(msg) => write!(f, "Malformed composite key: {}", msg),
            Error::PartialBatch {
                operation,
                failed,
                total,
            } => write!(
                f,
                "{} of {} items failed during {}; the other items were committed",
                failed, total, operation
            ),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::NotFound(key) => write!(f, "Key not found: {}", key),
            Error::Query(msg) => write!(f, "{}", msg),
            Error::UnknownOperation(name) => write!(
                f,
                "Invalid invoke function name '{}'. Expecting one of: {}",
                name,
                crate::dispatch::Operation::NAMES.join(", ")
            ),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedPayload(err.to_string())
    }
}

/// Result type alias for StateKV operations.
pub type Result<T> = std::result::Result<T, Error>;

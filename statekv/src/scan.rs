//! Drains state iterators into result collections.
//!
//! Each collector takes its iterator by value, so the storage cursor is
//! released when the collector returns, whether it finished, skipped
//! entries or bailed out on an error. Output order is iteration order.

use bytes::Bytes;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{ScanOutcome, StateEntry};
use crate::storage::{StateIterator, StateStorage};

/// Collects raw entries until the iterator is exhausted.
pub(crate) async fn collect_entries(mut iter: StateIterator) -> Result<Vec<StateEntry>> {
    let mut entries = Vec::new();
    while let Some(entry) = iter.next().await? {
        entries.push(entry);
    }
    Ok(entries)
}

/// Resolves index entries to the plain entries they point at.
///
/// The last attribute of each composite key names the plain key whose value
/// is fetched. A key that does not decode fails the scan. A key with no
/// attributes is skipped and counted. A plain key that no longer exists,
/// or a last attribute that is not a valid plain key, resolves to an empty
/// value.
pub(crate) async fn collect_resolved(
    mut iter: StateIterator,
    storage: &StateStorage,
) -> Result<ScanOutcome<StateEntry>> {
    let mut outcome = ScanOutcome::default();
    while let Some(entry) = iter.next().await? {
        let (object_type, attributes) = storage.split_composite_key(&entry.key)?;
        let Some(actual_key) = attributes.last() else {
            warn!(object_type = %object_type, "skipping index entry with no attributes");
            outcome.skipped += 1;
            continue;
        };
        let value = match storage.get_state(actual_key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(Error::InvalidInput(msg)) => {
                warn!(key = %actual_key, error = %msg, "index entry names an invalid plain key");
                Bytes::new()
            }
            Err(err) => return Err(err),
        };
        outcome
            .entries
            .push(StateEntry::new(actual_key.clone(), value));
    }
    Ok(outcome)
}

/// Collects the decoded attribute list of every index entry.
///
/// Entries whose key does not decode are skipped and counted.
pub(crate) async fn collect_attributes(
    mut iter: StateIterator,
    storage: &StateStorage,
) -> Result<ScanOutcome<Vec<String>>> {
    let mut outcome = ScanOutcome::default();
    while let Some(entry) = iter.next().await? {
        match storage.split_composite_key(&entry.key) {
            Ok((_, attributes)) => outcome.entries.push(attributes),
            Err(err) => {
                warn!(
                    key = %String::from_utf8_lossy(&entry.key),
                    error = %err,
                    "skipping undecodable index entry"
                );
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}

//! Core StateDb implementation.

use std::sync::Arc;

use bytes::Bytes;
use common::Storage;
use common::storage::factory::create_storage;
use tracing::{debug, warn};

use crate::config::{Config, WriteOptions};
use crate::dispatch::{Operation, Response, dispatch};
use crate::error::{Error, Result};
use crate::model::{CompositeKey, KeyValuePair, ScanOutcome, StateEntry};
use crate::query::{QueryEngine, SelectorQueryEngine};
use crate::scan::{collect_attributes, collect_entries, collect_resolved};
use crate::storage::StateStorage;

/// Ledger state access: plain keys, composite key indexes and queries.
///
/// Every operation runs to completion before returning, including draining
/// and releasing any iterator it opened.
///
/// # Example
///
/// ```ignore
/// use statekv::{Config, StateDb};
///
/// let db = StateDb::open(Config::default()).await?;
///
/// db.put("AnswerKey2", "Answer2Value").await?;
/// db.bulk_create_composite_keys(&[CompositeKey::new(
///     "UniqueVersionID~QuestionID~AnswerKey",
///     vec!["U".into(), "Q2".into(), "AnswerKey2".into()],
/// )])
/// .await?;
///
/// let outcome = db
///     .scan_by_partial_composite_key(
///         "UniqueVersionID~QuestionID~AnswerKey",
///         &["U".into(), "Q2".into()],
///     )
///     .await?;
/// assert_eq!(outcome.entries[0].value, "Answer2Value");
/// ```
pub struct StateDb {
    storage: StateStorage,
    query_engine: Arc<dyn QueryEngine>,
}

impl StateDb {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub async fn open(config: Config) -> Result<Self> {
        let storage = create_storage(&config.storage).await?;
        Ok(Self::with_storage(storage, &config.write))
    }

    /// Creates a StateDb over an existing storage implementation.
    pub fn with_storage(storage: Arc<dyn Storage>, write_options: &WriteOptions) -> Self {
        Self {
            storage: StateStorage::new(storage, write_options.into()),
            query_engine: Arc::new(SelectorQueryEngine::new()),
        }
    }

    /// Replaces the engine used by [`query`](Self::query).
    pub fn with_query_engine(mut self, query_engine: Arc<dyn QueryEngine>) -> Self {
        self.query_engine = query_engine;
        self
    }

    /// Runs a named operation with positional string arguments.
    ///
    /// Never fails: errors are reported through the returned [`Response`].
    pub async fn invoke(&self, operation: &str, args: &[String]) -> Response {
        let operation = Operation::parse(operation);
        let result = dispatch(self, &operation, args).await;
        if let Err(err) = &result {
            debug!(operation = operation.name(), error = %err, "invoke failed");
        }
        Response::from(result)
    }

    /// Puts a value, overwriting any existing value.
    pub async fn put(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        debug!(key = %key, "put");
        self.storage.put_state(key, value.into()).await
    }

    /// Gets the value for a key, or None if the key holds no value.
    ///
    /// An explicitly stored empty value is returned as `Some` empty bytes.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        debug!(key = %key, "get");
        self.storage.get_state(key).await
    }

    /// Deletes a key. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        debug!(key = %key, "delete");
        self.storage.delete_state(key).await
    }

    /// Puts every record, continuing past individual failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialBatch`] if any record failed. Records that
    /// succeeded stay written.
    pub async fn bulk_put(&self, records: &[KeyValuePair]) -> Result<()> {
        let mut failed = 0;
        for record in records {
            let value = Bytes::from(record.value.clone());
            if let Err(err) = self.storage.put_state(&record.key, value).await {
                warn!(key = %record.key, error = %err, "bulk put item failed");
                failed += 1;
            }
        }
        debug!(total = records.len(), failed, "bulk put");
        batch_result("bulkPut", failed, records.len())
    }

    /// Writes an index entry for every composite key, continuing past
    /// individual failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialBatch`] if any entry failed. Entries that
    /// succeeded stay written.
    pub async fn bulk_create_composite_keys(&self, keys: &[CompositeKey]) -> Result<()> {
        let mut failed = 0;
        for key in keys {
            if let Err(err) = self
                .storage
                .put_index_entry(&key.object_type, &key.attributes)
                .await
            {
                warn!(
                    object_type = %key.object_type,
                    attributes = ?key.attributes,
                    error = %err,
                    "composite key creation failed"
                );
                failed += 1;
            }
        }
        debug!(total = keys.len(), failed, "bulk create composite keys");
        batch_result("bulkCreateCompositeKey", failed, keys.len())
    }

    /// Returns plain entries with keys in `[start_key, end_key)`.
    ///
    /// An empty `start_key` starts at the first plain key and an empty
    /// `end_key` scans to the end.
    pub async fn scan(&self, start_key: &str, end_key: &str) -> Result<Vec<StateEntry>> {
        debug!(start_key = %start_key, end_key = %end_key, "scan");
        let iter = self.storage.range_iter(start_key, end_key).await?;
        collect_entries(iter).await
    }

    /// Finds index entries of `object_type` whose attributes start with
    /// `attributes` and resolves each to the plain entry named by its last
    /// attribute.
    pub async fn scan_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[String],
    ) -> Result<ScanOutcome<StateEntry>> {
        debug!(object_type = %object_type, attributes = ?attributes, "scan by partial composite key");
        let iter = self
            .storage
            .partial_composite_key_iter(object_type, attributes)
            .await?;
        collect_resolved(iter, &self.storage).await
    }

    /// Like [`scan_by_partial_composite_key`](Self::scan_by_partial_composite_key)
    /// but returns the decoded attribute lists.
    pub async fn scan_by_partial_composite_key_for_attributes(
        &self,
        object_type: &str,
        attributes: &[String],
    ) -> Result<ScanOutcome<Vec<String>>> {
        debug!(object_type = %object_type, attributes = ?attributes, "scan attributes by partial composite key");
        let iter = self
            .storage
            .partial_composite_key_iter(object_type, attributes)
            .await?;
        collect_attributes(iter, &self.storage).await
    }

    /// Runs a rich query through the configured [`QueryEngine`].
    pub async fn query(&self, query: &str) -> Result<Vec<StateEntry>> {
        debug!(query = %query, "query");
        let storage = self.storage.as_read();
        let iter = self.query_engine.execute(storage.as_ref(), query).await?;
        collect_entries(iter).await
    }

    /// Flushes pending writes to durable storage.
    pub async fn flush(&self) -> Result<()> {
        self.storage.flush().await
    }

    /// Closes the store, flushing pending writes first.
    pub async fn close(self) -> Result<()> {
        self.storage.flush().await?;
        self.storage.close().await
    }
}

fn batch_result(operation: &'static str, failed: usize, total: usize) -> Result<()> {
    if failed == 0 {
        Ok(())
    } else {
        Err(Error::PartialBatch {
            operation,
            failed,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use common::StorageRead;
    use common::storage::in_memory::{FailingStorage, InMemoryStorage};
    use common::{RecordsIterator, StorageError};

    use super::*;
    use crate::storage::StateIterator;

    const OBJECT_TYPE: &str = "UniqueVersionID~QuestionID~AnswerKey";

    fn attrs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn pair(key: &str, value: &str) -> KeyValuePair {
        KeyValuePair {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn in_memory_db() -> StateDb {
        StateDb::with_storage(Arc::new(InMemoryStorage::new()), &WriteOptions::default())
    }

    #[tokio::test]
    async fn should_distinguish_missing_key_from_empty_value() {
        // given
        let db = in_memory_db();
        db.put("empty", Bytes::new()).await.unwrap();

        // when
        let empty = db.get("empty").await.unwrap();
        let missing = db.get("missing").await.unwrap();

        // then
        assert_eq!(empty, Some(Bytes::new()));
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn should_scan_half_open_range() {
        // given
        let db = in_memory_db();
        for i in 1..20 {
            db.put(&format!("key{:02}", i), format!("value{:02}", i))
                .await
                .unwrap();
        }

        // when
        let entries = db.scan("key07", "key14").await.unwrap();

        // then
        let expected: Vec<StateEntry> = (7..14)
            .map(|i| StateEntry::new(format!("key{:02}", i), format!("value{:02}", i)))
            .collect();
        assert_eq!(entries, expected);
    }

    #[tokio::test]
    async fn should_leave_same_state_after_repeated_bulk_put() {
        // given
        let db = in_memory_db();
        let batch = vec![pair("a", "1"), pair("b", "2"), pair("a", "3")];

        // when
        db.bulk_put(&batch).await.unwrap();
        let once = db.scan("", "").await.unwrap();
        db.bulk_put(&batch).await.unwrap();
        let twice = db.scan("", "").await.unwrap();

        // then
        assert_eq!(once, twice);
        assert_eq!(
            once,
            vec![StateEntry::new("a", "3"), StateEntry::new("b", "2")]
        );
    }

    #[tokio::test]
    async fn should_commit_valid_items_when_bulk_put_partially_fails() {
        // given
        let db = in_memory_db();
        let batch = vec![pair("a", "1"), pair("", "2"), pair("c", "3")];

        // when
        let result = db.bulk_put(&batch).await;

        // then
        assert_eq!(
            result,
            Err(Error::PartialBatch {
                operation: "bulkPut",
                failed: 1,
                total: 3,
            })
        );
        assert_eq!(db.get("a").await.unwrap(), Some(Bytes::from("1")));
        assert_eq!(db.get("c").await.unwrap(), Some(Bytes::from("3")));
    }

    #[tokio::test]
    async fn should_continue_past_store_fault_during_bulk_put() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let db = StateDb::with_storage(failing.clone(), &WriteOptions::default());
        failing.reject_key("b");

        // when
        let result = db
            .bulk_put(&[pair("a", "1"), pair("b", "2"), pair("c", "3")])
            .await;

        // then
        assert!(matches!(
            result,
            Err(Error::PartialBatch {
                failed: 1,
                total: 3,
                ..
            })
        ));
        assert_eq!(db.get("c").await.unwrap(), Some(Bytes::from("3")));
        assert_eq!(db.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_report_composite_keys_without_attributes_as_partial_failure() {
        // given
        let db = in_memory_db();
        let keys = vec![
            CompositeKey::new(OBJECT_TYPE, attrs(&["U", "Q1", "AnswerKey1"])),
            CompositeKey::new(OBJECT_TYPE, vec![]),
        ];

        // when
        let result = db.bulk_create_composite_keys(&keys).await;
        let outcome = db
            .scan_by_partial_composite_key_for_attributes(OBJECT_TYPE, &[])
            .await
            .unwrap();

        // then
        assert!(matches!(
            result,
            Err(Error::PartialBatch {
                operation: "bulkCreateCompositeKey",
                failed: 1,
                total: 2,
            })
        ));
        assert_eq!(outcome.entries, vec![attrs(&["U", "Q1", "AnswerKey1"])]);
    }

    #[tokio::test]
    async fn should_scan_by_partial_composite_key() {
        // given
        let db = in_memory_db();
        let keys: Vec<CompositeKey> = [
            ("Q1", "AnswerKey1"),
            ("Q2", "AnswerKey2"),
            ("Q3", "AnswerKey3"),
        ]
        .into_iter()
        .map(|(q, a)| CompositeKey::new(OBJECT_TYPE, attrs(&["U", q, a])))
        .collect();
        db.bulk_create_composite_keys(&keys).await.unwrap();
        db.put("AnswerKey2", "Answer2Value").await.unwrap();

        // when
        let resolved = db
            .scan_by_partial_composite_key(OBJECT_TYPE, &attrs(&["U", "Q2"]))
            .await
            .unwrap();
        let attributes = db
            .scan_by_partial_composite_key_for_attributes(OBJECT_TYPE, &attrs(&["U", "Q2"]))
            .await
            .unwrap();

        // then
        assert_eq!(
            resolved.entries,
            vec![StateEntry::new("AnswerKey2", "Answer2Value")]
        );
        assert_eq!(attributes.entries, vec![attrs(&["U", "Q2", "AnswerKey2"])]);
    }

    #[tokio::test]
    async fn should_propagate_scan_fault() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let db = StateDb::with_storage(failing.clone(), &WriteOptions::default());
        failing.fail_scan(StorageError::Storage("scan failed".to_string()));

        // when
        let result = db.scan("a", "z").await;

        // then
        assert_eq!(result, Err(Error::Storage("scan failed".to_string())));
    }

    #[tokio::test]
    async fn should_report_partial_batch_when_index_write_fails_once() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let db = StateDb::with_storage(failing.clone(), &WriteOptions::default());
        failing.fail_apply_once(StorageError::Storage("write stalled".to_string()));
        let keys = vec![
            CompositeKey::new(OBJECT_TYPE, attrs(&["U", "Q1", "AnswerKey1"])),
            CompositeKey::new(OBJECT_TYPE, attrs(&["U", "Q2", "AnswerKey2"])),
        ];

        // when
        let result = db.bulk_create_composite_keys(&keys).await;
        let outcome = db
            .scan_by_partial_composite_key_for_attributes(OBJECT_TYPE, &[])
            .await
            .unwrap();

        // then
        assert_eq!(
            result,
            Err(Error::PartialBatch {
                operation: "bulkCreateCompositeKey",
                failed: 1,
                total: 2,
            })
        );
        assert_eq!(outcome.entries, vec![attrs(&["U", "Q2", "AnswerKey2"])]);
    }

    #[tokio::test]
    async fn should_propagate_write_fault_from_put() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let db = StateDb::with_storage(failing.clone(), &WriteOptions::default());
        failing.fail_apply(StorageError::Storage("disk full".to_string()));

        // when
        let first = db.put("k", "v").await;
        let second = db.delete("k").await;

        // then
        assert_eq!(first, Err(Error::Storage("disk full".to_string())));
        assert_eq!(second, Err(Error::Storage("disk full".to_string())));
    }

    struct FixedQueryEngine {
        result: Result<Vec<StateEntry>>,
    }

    #[async_trait]
    impl QueryEngine for FixedQueryEngine {
        async fn execute(&self, _storage: &dyn StorageRead, _query: &str) -> Result<StateIterator> {
            let records = self
                .result
                .clone()?
                .into_iter()
                .map(|e| common::Record::new(e.key, e.value))
                .collect();
            Ok(StateIterator::new(Box::new(RecordsIterator::new(records))))
        }
    }

    #[tokio::test]
    async fn should_delegate_query_to_configured_engine() {
        // given
        let db = in_memory_db().with_query_engine(Arc::new(FixedQueryEngine {
            result: Ok(vec![StateEntry::new("z", "1"), StateEntry::new("a", "2")]),
        }));

        // when
        let entries = db.query("anything").await.unwrap();

        // then
        assert_eq!(
            entries,
            vec![StateEntry::new("z", "1"), StateEntry::new("a", "2")]
        );
    }

    #[tokio::test]
    async fn should_pass_query_fault_through() {
        // given
        let db = in_memory_db().with_query_engine(Arc::new(FixedQueryEngine {
            result: Err(Error::Query("index not ready".to_string())),
        }));

        // when
        let response = db.invoke("query", &["{}".to_string()]).await;

        // then
        assert!(!response.is_success());
        assert_eq!(response.message, "index not ready");
    }

    #[tokio::test]
    async fn should_flush_writes_when_durability_requested() {
        // given
        let db = StateDb::with_storage(
            Arc::new(InMemoryStorage::new()),
            &WriteOptions {
                await_durable: true,
            },
        );

        // when
        db.put("k", "v").await.unwrap();

        // then
        assert_eq!(db.get("k").await.unwrap(), Some(Bytes::from("v")));
        db.close().await.unwrap();
    }
}

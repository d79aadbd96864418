use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{RecordOp, RecordsIterator, Storage};
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// In-memory implementation of the Storage trait using a BTreeMap.
///
/// Writes are visible immediately and nothing survives the process, which
/// makes this the backend of choice for tests and one-shot tooling.
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&key).map(|value| Record::new(key, value.clone())))
    }

    /// Copies the matching records out under the read lock; the returned
    /// iterator holds no lock.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        if range.is_empty() {
            return Ok(Box::new(RecordsIterator::new(Vec::new())));
        }

        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        let records = data
            .range((range.start, range.end))
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect();

        Ok(Box::new(RecordsIterator::new(records)))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for op in ops {
            match op {
                RecordOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                RecordOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }

    async fn flush(&self) -> StorageResult<()> {
        // all writes are immediately visible
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(feature = "test-utils")]
pub use failing::FailingStorage;

#[cfg(feature = "test-utils")]
mod failing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use arc_swap::ArcSwap;
    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::storage::{RecordOp, Storage};
    use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

    /// Injected failure that fires either once or on every call.
    #[derive(Clone)]
    enum Failure {
        Once(StorageError),
        Persistent(StorageError),
    }

    type FailSlot = ArcSwap<Option<Failure>>;

    fn empty_slot() -> FailSlot {
        ArcSwap::from_pointee(None)
    }

    /// Returns the injected error, clearing it first if it was a one-shot.
    fn check_failure(slot: &FailSlot) -> StorageResult<()> {
        let guard = slot.load();
        match guard.as_ref() {
            None => Ok(()),
            Some(Failure::Persistent(err)) => Err(err.clone()),
            Some(Failure::Once(_)) => {
                let prev = slot.swap(Arc::new(None));
                match prev.as_ref() {
                    Some(Failure::Once(err)) => Err(err.clone()),
                    _ => Ok(()),
                }
            }
        }
    }

    /// A storage wrapper that delegates to an inner [`Storage`] but can
    /// inject failures on demand.
    ///
    /// Besides failing whole calls, it can fail iterator `next` after a
    /// number of records and it counts iterators that are still alive, so
    /// tests can check that cursors are released on error paths.
    ///
    /// Gated behind the `test-utils` feature.
    ///
    /// ```ignore
    /// let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
    /// storage.fail_next_after(2, StorageError::Storage("cursor lost".into()));
    /// // the third `next` on any new iterator now returns Err(...)
    /// ```
    pub struct FailingStorage {
        inner: Arc<dyn Storage>,
        fail_get: FailSlot,
        fail_apply: FailSlot,
        fail_scan: FailSlot,
        fail_next: ArcSwap<Option<(usize, StorageError)>>,
        rejected_keys: ArcSwap<Vec<Bytes>>,
        open_iterators: Arc<AtomicUsize>,
    }

    impl FailingStorage {
        /// Wraps an existing storage, with all failure injections initially `None`.
        pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
            Arc::new(Self {
                inner,
                fail_get: empty_slot(),
                fail_apply: empty_slot(),
                fail_scan: empty_slot(),
                fail_next: ArcSwap::from_pointee(None),
                rejected_keys: ArcSwap::from_pointee(Vec::new()),
                open_iterators: Arc::new(AtomicUsize::new(0)),
            })
        }

        /// Makes `get` return the given error on every subsequent call.
        pub fn fail_get(&self, err: StorageError) {
            self.fail_get.store(Arc::new(Some(Failure::Persistent(err))));
        }

        /// Makes `apply` return the given error on every subsequent call.
        pub fn fail_apply(&self, err: StorageError) {
            self.fail_apply
                .store(Arc::new(Some(Failure::Persistent(err))));
        }

        /// Makes `apply` return the given error on the next call only.
        pub fn fail_apply_once(&self, err: StorageError) {
            self.fail_apply.store(Arc::new(Some(Failure::Once(err))));
        }

        /// Makes `scan_iter` return the given error on every subsequent call.
        pub fn fail_scan(&self, err: StorageError) {
            self.fail_scan.store(Arc::new(Some(Failure::Persistent(err))));
        }

        /// Makes iterators created from now on fail once they have yielded
        /// `records` records.
        pub fn fail_next_after(&self, records: usize, err: StorageError) {
            self.fail_next.store(Arc::new(Some((records, err))));
        }

        /// Makes `apply` reject any batch that writes or deletes `key`.
        pub fn reject_key(&self, key: impl Into<Bytes>) {
            let mut keys = self.rejected_keys.load().as_ref().clone();
            keys.push(key.into());
            self.rejected_keys.store(Arc::new(keys));
        }

        /// Number of iterators handed out and not yet dropped.
        pub fn open_iterators(&self) -> usize {
            self.open_iterators.load(Ordering::SeqCst)
        }

        fn check_rejected(&self, ops: &[RecordOp]) -> StorageResult<()> {
            let rejected = self.rejected_keys.load();
            for op in ops {
                let key = match op {
                    RecordOp::Put(record) => &record.key,
                    RecordOp::Delete(key) => key,
                };
                if rejected.contains(key) {
                    return Err(StorageError::Storage(format!(
                        "write rejected for key {:?}",
                        String::from_utf8_lossy(key)
                    )));
                }
            }
            Ok(())
        }
    }

    struct TrackedIterator {
        inner: Box<dyn StorageIterator + Send + 'static>,
        yielded: usize,
        fail_after: Option<(usize, StorageError)>,
        open_iterators: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StorageIterator for TrackedIterator {
        async fn next(&mut self) -> StorageResult<Option<Record>> {
            if let Some((limit, err)) = &self.fail_after {
                if self.yielded >= *limit {
                    return Err(err.clone());
                }
            }
            let record = self.inner.next().await?;
            if record.is_some() {
                self.yielded += 1;
            }
            Ok(record)
        }
    }

    impl Drop for TrackedIterator {
        fn drop(&mut self) {
            self.open_iterators.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StorageRead for FailingStorage {
        async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
            check_failure(&self.fail_get)?;
            self.inner.get(key).await
        }

        async fn scan_iter(
            &self,
            range: BytesRange,
        ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
            check_failure(&self.fail_scan)?;
            let inner = self.inner.scan_iter(range).await?;
            self.open_iterators.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TrackedIterator {
                inner,
                yielded: 0,
                fail_after: self.fail_next.load().as_ref().clone(),
                open_iterators: Arc::clone(&self.open_iterators),
            }))
        }
    }

    #[async_trait]
    impl Storage for FailingStorage {
        async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
            check_failure(&self.fail_apply)?;
            self.check_rejected(&ops)?;
            self.inner.apply(ops).await
        }

        async fn flush(&self) -> StorageResult<()> {
            self.inner.flush().await
        }

        async fn close(&self) -> StorageResult<()> {
            self.inner.close().await
        }
    }
}

//! Ledger-state view over the generic storage traits.
//!
//! [`StateStorage`] is the only place that talks to `common::Storage`. It
//! validates plain keys, builds composite keys through [`crate::serde`], and
//! hands out [`StateIterator`]s for range and partial composite key scans.

use std::sync::Arc;

use bytes::Bytes;
use common::{BytesRange, Record, RecordOp, Storage, StorageIterator, StorageRead};

use crate::error::Result;
use crate::model::StateEntry;
use crate::serde::{
    INDEX_SENTINEL, decode_composite_key, encode_composite_key, encode_plain_key,
    partial_composite_key_range, plain_key_range,
};

#[derive(Clone)]
pub(crate) struct StateStorage {
    storage: Arc<dyn Storage>,
    write_options: common::WriteOptions,
}

impl StateStorage {
    pub(crate) fn new(storage: Arc<dyn Storage>, write_options: common::WriteOptions) -> Self {
        Self {
            storage,
            write_options,
        }
    }

    /// Returns a read-only view of this storage.
    pub(crate) fn as_read(&self) -> Arc<dyn StorageRead> {
        Arc::clone(&self.storage) as Arc<dyn StorageRead>
    }

    /// Gets the value stored under a plain key.
    pub(crate) async fn get_state(&self, key: &str) -> Result<Option<Bytes>> {
        let storage_key = encode_plain_key(key)?;
        let record = self.storage.get(storage_key).await?;
        Ok(record.map(|r| r.value))
    }

    /// Puts a value under a plain key, overwriting any existing value.
    pub(crate) async fn put_state(&self, key: &str, value: Bytes) -> Result<()> {
        let storage_key = encode_plain_key(key)?;
        self.write(RecordOp::Put(Record::new(storage_key, value)))
            .await
    }

    /// Deletes a plain key. No-op if the key does not exist.
    pub(crate) async fn delete_state(&self, key: &str) -> Result<()> {
        let storage_key = encode_plain_key(key)?;
        self.write(RecordOp::Delete(storage_key)).await
    }

    /// Writes an index entry for `object_type`/`attributes` and returns its key.
    pub(crate) async fn put_index_entry(
        &self,
        object_type: &str,
        attributes: &[String],
    ) -> Result<Bytes> {
        let index_key = encode_composite_key(object_type, attributes)?;
        self.write(RecordOp::Put(Record::new(
            index_key.clone(),
            Bytes::from_static(INDEX_SENTINEL),
        )))
        .await?;
        Ok(index_key)
    }

    /// Iterates plain keys in `[start_key, end_key)`.
    pub(crate) async fn range_iter(&self, start_key: &str, end_key: &str) -> Result<StateIterator> {
        let range = plain_key_range(start_key, end_key)?;
        self.iter(range).await
    }

    /// Iterates index entries of `object_type` whose attributes start with
    /// `attributes`.
    pub(crate) async fn partial_composite_key_iter(
        &self,
        object_type: &str,
        attributes: &[String],
    ) -> Result<StateIterator> {
        self.iter(partial_composite_key_range(object_type, attributes))
            .await
    }

    /// Splits a composite key into object type and attributes.
    pub(crate) fn split_composite_key(&self, key: &[u8]) -> Result<(String, Vec<String>)> {
        decode_composite_key(key)
    }

    async fn iter(&self, range: BytesRange) -> Result<StateIterator> {
        let inner = self.storage.scan_iter(range).await?;
        Ok(StateIterator::new(inner))
    }

    async fn write(&self, op: RecordOp) -> Result<()> {
        self.storage
            .apply_with_options(vec![op], self.write_options.clone())
            .await?;
        Ok(())
    }

    pub(crate) async fn flush(&self) -> Result<()> {
        self.storage.flush().await?;
        Ok(())
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.storage.close().await?;
        Ok(())
    }
}

/// Forward-only iterator over state entries in key order.
///
/// The underlying storage cursor is released when the iterator is dropped.
pub struct StateIterator {
    inner: Box<dyn StorageIterator + Send>,
}

impl StateIterator {
    pub fn new(inner: Box<dyn StorageIterator + Send>) -> Self {
        Self { inner }
    }

    /// Returns the next entry, or None if iteration is complete.
    pub async fn next(&mut self) -> Result<Option<StateEntry>> {
        let record = self.inner.next().await?;
        Ok(record.map(|r| StateEntry::new(r.key, r.value)))
    }
}

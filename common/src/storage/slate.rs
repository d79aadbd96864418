//! [`Storage`] backed by a SlateDB database.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::{Db, WriteBatch};

use super::{
    Record, RecordOp, RecordsIterator, Storage, StorageError, StorageIterator, StorageRead,
    StorageResult, WriteOptions,
};
use crate::BytesRange;

pub struct SlateDbStorage {
    db: Arc<Db>,
}

impl SlateDbStorage {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    fn write_batch(ops: Vec<RecordOp>) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                RecordOp::Put(record) => batch.put(record.key, record.value),
                RecordOp::Delete(key) => batch.delete(key),
            }
        }
        batch
    }
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    /// Drains the SlateDB iterator before returning so the returned cursor
    /// does not borrow the database handle.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        if range.is_empty() {
            return Ok(Box::new(RecordsIterator::new(Vec::new())));
        }

        let mut iter = self
            .db
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;

        let mut records = Vec::new();
        while let Some(kv) = iter.next().await.map_err(StorageError::from_storage)? {
            records.push(Record::new(kv.key, kv.value));
        }
        Ok(Box::new(RecordsIterator::new(records)))
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        self.db
            .write(Self::write_batch(ops))
            .await
            .map_err(StorageError::from_storage)
    }

    async fn apply_with_options(
        &self,
        ops: Vec<RecordOp>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let mut write_options = slatedb::config::WriteOptions::default();
        write_options.await_durable = options.await_durable;
        self.db
            .write_with_options(Self::write_batch(ops), &write_options)
            .await
            .map_err(StorageError::from_storage)
    }

    async fn flush(&self) -> StorageResult<()> {
        self.db.flush().await.map_err(StorageError::from_storage)
    }

    async fn close(&self) -> StorageResult<()> {
        self.db.close().await.map_err(StorageError::from_storage)
    }
}

#[cfg(test)]
mod tests {
    use slatedb::object_store::memory::InMemory;

    use super::*;

    async fn slate_storage() -> SlateDbStorage {
        let object_store = Arc::new(InMemory::new());
        let db = slatedb::DbBuilder::new("test", object_store)
            .build()
            .await
            .unwrap();
        SlateDbStorage::new(Arc::new(db))
    }

    #[tokio::test]
    async fn should_put_get_and_delete_through_slatedb() {
        // given
        let storage = slate_storage().await;
        let key = Bytes::from("AnswerKey2");

        // when
        storage
            .apply(vec![Record::new(key.clone(), Bytes::from("Answer2Value")).into()])
            .await
            .unwrap();
        let stored = storage.get(key.clone()).await.unwrap();
        storage.apply(vec![RecordOp::Delete(key.clone())]).await.unwrap();
        let deleted = storage.get(key).await.unwrap();

        // then
        assert_eq!(stored.unwrap().value, Bytes::from("Answer2Value"));
        assert!(deleted.is_none());
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn should_scan_slatedb_range_in_key_order() {
        // given
        let storage = slate_storage().await;
        let ops = ["c", "a", "b", "d"]
            .into_iter()
            .map(|k| Record::new(Bytes::from(k), Bytes::from(k)).into())
            .collect();
        storage.apply(ops).await.unwrap();

        // when
        let records = storage
            .scan(BytesRange::half_open(Bytes::from("a"), Bytes::from("d")))
            .await
            .unwrap();

        // then
        let keys: Vec<_> = records.iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        storage.close().await.unwrap();
    }
}

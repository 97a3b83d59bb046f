use crate::model::{Collection, LineageRow};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use crucible_types::{LedgerEntry, LedgerRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Append-only storage for ledger records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append one record. Fails with [`StoreError::Conflict`] unless
    /// `record.entry.seq` is exactly the next free sequence number.
    async fn append(&self, record: LedgerRecord) -> StoreResult<()>;

    /// All records in sequence order.
    async fn read_all(&self) -> StoreResult<Vec<LedgerRecord>>;

    /// Records with `from <= seq < to`, in sequence order.
    async fn read_range(&self, from: u64, to: u64) -> StoreResult<Vec<LedgerRecord>>;

    /// The newest entry, if any.
    async fn tip(&self) -> StoreResult<Option<LedgerEntry>>;

    async fn len(&self) -> StoreResult<u64>;
}

/// Keyed JSON records grouped by [`Collection`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace a record. Replacing keeps its original list position.
    async fn put(
        &self,
        collection: Collection,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<()>;

    async fn get(&self, collection: Collection, key: &str)
        -> StoreResult<Option<serde_json::Value>>;

    /// Records in first-insertion order.
    async fn list(&self, collection: Collection) -> StoreResult<Vec<serde_json::Value>>;
}

/// Everything the kernel needs from a backend.
#[async_trait]
pub trait CrucibleStore: LedgerStore + RecordStore {
    /// Derived view joining an artifact with its decision and ledger entry.
    async fn lineage_view(&self, artifact_id: &str) -> StoreResult<Option<LineageRow>>;
}

/// Typed helpers over [`RecordStore`].
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    async fn put_json<T>(&self, collection: Collection, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.put(collection, key, value).await
    }

    async fn get_json<T>(&self, collection: Collection, key: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(collection, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn require_json<T>(&self, collection: Collection, key: &str) -> StoreResult<T>
    where
        T: DeserializeOwned,
    {
        self.get_json(collection, key)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{key}")))
    }

    async fn list_json<T>(&self, collection: Collection) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.list(collection)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

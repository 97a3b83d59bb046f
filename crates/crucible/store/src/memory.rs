//! In-memory reference implementation of the crucible store traits.
//!
//! Deterministic and test-friendly. Durable deployments use the SQLite
//! adapter.

use crate::model::{Collection, LineageRow};
use crate::traits::{CrucibleStore, LedgerStore, RecordStore};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use crucible_types::{LedgerEntry, LedgerRecord, OpKind};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Records {
    /// `key -> (insertion order, value)`.
    rows: HashMap<String, (u64, serde_json::Value)>,
    next_order: u64,
}

/// In-memory crucible store.
#[derive(Default)]
pub struct InMemoryStore {
    ledger: RwLock<Vec<LedgerRecord>>,
    records: RwLock<HashMap<Collection, Records>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite a stored ledger record in place, bypassing every check.
    ///
    /// Used by integrity drills to simulate out-of-band tampering.
    pub fn tamper_with<F>(&self, seq: u64, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut LedgerRecord),
    {
        let mut guard = self
            .ledger
            .write()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))?;
        let record = guard
            .get_mut(seq as usize)
            .ok_or_else(|| StoreError::NotFound(format!("ledger entry {seq}")))?;
        mutate(record);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn append(&self, record: LedgerRecord) -> StoreResult<()> {
        let mut guard = self
            .ledger
            .write()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))?;
        let next = guard.len() as u64;
        if record.entry.seq != next {
            return Err(StoreError::Conflict(format!(
                "expected seq {next}, got {}",
                record.entry.seq
            )));
        }
        guard.push(record);
        Ok(())
    }

    async fn read_all(&self) -> StoreResult<Vec<LedgerRecord>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    async fn read_range(&self, from: u64, to: u64) -> StoreResult<Vec<LedgerRecord>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|r| r.entry.seq >= from && r.entry.seq < to)
            .cloned()
            .collect())
    }

    async fn tip(&self) -> StoreResult<Option<LedgerEntry>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard.last().map(|r| r.entry.clone()))
    }

    async fn len(&self) -> StoreResult<u64> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard.len() as u64)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn put(
        &self,
        collection: Collection,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::Backend("records lock poisoned".to_string()))?;
        let records = guard.entry(collection).or_default();
        if let Some(existing) = records.rows.get_mut(key) {
            existing.1 = value;
        } else {
            let order = records.next_order;
            records.next_order += 1;
            records.rows.insert(key.to_string(), (order, value));
        }
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        key: &str,
    ) -> StoreResult<Option<serde_json::Value>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::Backend("records lock poisoned".to_string()))?;
        Ok(guard
            .get(&collection)
            .and_then(|r| r.rows.get(key))
            .map(|(_, v)| v.clone()))
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<serde_json::Value>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::Backend("records lock poisoned".to_string()))?;
        let Some(records) = guard.get(&collection) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<&(u64, serde_json::Value)> = records.rows.values().collect();
        rows.sort_by_key(|(order, _)| *order);
        Ok(rows.into_iter().map(|(_, v)| v.clone()).collect())
    }
}

#[async_trait]
impl CrucibleStore for InMemoryStore {
    async fn lineage_view(&self, artifact_id: &str) -> StoreResult<Option<LineageRow>> {
        let Some(artifact) = self.get(Collection::Artifacts, artifact_id).await? else {
            return Ok(None);
        };
        let decision_id = artifact
            .get("decision_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let decision = match &decision_id {
            Some(id) => self.get(Collection::Decisions, id).await?,
            None => None,
        };
        let field = |name: &str| {
            decision
                .as_ref()
                .and_then(|d| d.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let ledger_seq = self
            .read_all()
            .await?
            .into_iter()
            .find(|r| {
                r.entry.op_kind == OpKind::ArtifactPublished
                    && r.payload.get("artifact_id").and_then(|v| v.as_str()) == Some(artifact_id)
            })
            .map(|r| r.entry.seq);
        Ok(Some(LineageRow {
            artifact_id: artifact_id.to_string(),
            plan_id: field("plan_id"),
            catalyst_id: field("catalyst_id"),
            decision_id,
            ledger_seq,
        }))
    }
}

//! SQLite adapter for crucible storage.
//!
//! The database is the transactional source of truth for a local crucible
//! installation. It is opened in WAL mode and created on demand.

use crate::model::{Collection, LineageRow};
use crate::traits::{CrucibleStore, LedgerStore, RecordStore};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crucible_types::{ContentHash, LedgerEntry, LedgerRecord, OpKind};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite-backed crucible store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and initialize schema.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_options(path, 4, 5).await
    }

    pub async fn open_with_options(
        path: impl AsRef<Path>,
        max_connections: u32,
        busy_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(busy_timeout_secs));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to open sqlite: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %path.as_ref().display(), "sqlite store opened");
        Ok(store)
    }

    /// Private in-memory database (single connection).
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Backend(format!("invalid sqlite url: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to open sqlite: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ledger_ddl = r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                seq INTEGER PRIMARY KEY,
                timestamp TEXT NOT NULL,
                op_kind TEXT NOT NULL,
                payload_digest TEXT NOT NULL,
                prev_hash TEXT NOT NULL,
                hash TEXT NOT NULL,
                payload TEXT NOT NULL
            )
        "#;
        sqlx::query(ledger_ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;

        for collection in Collection::ALL {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                collection.table()
            );
            sqlx::query(&ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        }

        let view_ddl = r#"
            CREATE VIEW IF NOT EXISTS lineage_view AS
            SELECT a.key AS artifact_id,
                   json_extract(a.value, '$.decision_id') AS decision_id,
                   json_extract(d.value, '$.plan_id') AS plan_id,
                   json_extract(d.value, '$.catalyst_id') AS catalyst_id,
                   (SELECT l.seq FROM ledger_entries l
                     WHERE l.op_kind = 'artifact_published'
                       AND json_extract(l.payload, '$.artifact_id') = a.key
                     ORDER BY l.seq LIMIT 1) AS ledger_seq
              FROM artifacts a
              LEFT JOIN decisions d ON d.key = json_extract(a.value, '$.decision_id')
        "#;
        sqlx::query(view_ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn append(&self, record: LedgerRecord) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let next: i64 = sqlx::query("SELECT COALESCE(MAX(seq) + 1, 0) AS next FROM ledger_entries")
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_conflict)?
            .try_get("next")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let seq = to_i64(record.entry.seq)?;
        if seq != next {
            debug!(expected = next, got = seq, "ledger append lost the sequence race");
            return Err(StoreError::Conflict(format!(
                "expected seq {next}, got {seq}"
            )));
        }

        let payload = serde_json::to_string(&record.payload)?;
        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (seq, timestamp, op_kind, payload_digest, prev_hash, hash, payload)
            VALUES
                (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(seq)
        .bind(record.entry.timestamp)
        .bind(record.entry.op_kind.as_str())
        .bind(record.entry.payload_digest.to_hex())
        .bind(record.entry.prev_hash.to_hex())
        .bind(record.entry.hash.to_hex())
        .bind(payload)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_conflict)?;

        tx.commit().await.map_err(map_sqlx_conflict)?;
        Ok(())
    }

    async fn read_all(&self) -> StoreResult<Vec<LedgerRecord>> {
        let rows = sqlx::query(
            "SELECT seq, timestamp, op_kind, payload_digest, prev_hash, hash, payload
               FROM ledger_entries ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(ledger_row_to_record).collect()
    }

    async fn read_range(&self, from: u64, to: u64) -> StoreResult<Vec<LedgerRecord>> {
        let rows = sqlx::query(
            "SELECT seq, timestamp, op_kind, payload_digest, prev_hash, hash, payload
               FROM ledger_entries WHERE seq >= ?1 AND seq < ?2 ORDER BY seq ASC",
        )
        .bind(to_i64(from)?)
        .bind(to_i64(to.min(i64::MAX as u64))?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(ledger_row_to_record).collect()
    }

    async fn tip(&self) -> StoreResult<Option<LedgerEntry>> {
        let row = sqlx::query(
            "SELECT seq, timestamp, op_kind, payload_digest, prev_hash, hash, payload
               FROM ledger_entries ORDER BY seq DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.map(|r| ledger_row_to_record(r).map(|rec| rec.entry))
            .transpose()
    }

    async fn len(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM ledger_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .try_get("n")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn put(
        &self,
        collection: Collection,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            collection.table()
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(serde_json::to_string(&value)?)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        key: &str,
    ) -> StoreResult<Option<serde_json::Value>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", collection.table());
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.map(|r| decode_value(&r)).transpose()
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<serde_json::Value>> {
        let sql = format!("SELECT value FROM {} ORDER BY rowid ASC", collection.table());
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(decode_value).collect()
    }
}

#[async_trait]
impl CrucibleStore for SqliteStore {
    async fn lineage_view(&self, artifact_id: &str) -> StoreResult<Option<LineageRow>> {
        let row = sqlx::query(
            "SELECT artifact_id, decision_id, plan_id, catalyst_id, ledger_seq
               FROM lineage_view WHERE artifact_id = ?1",
        )
        .bind(artifact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let get_opt = |name: &str| -> StoreResult<Option<String>> {
            row.try_get::<Option<String>, _>(name)
                .map_err(|e| StoreError::Backend(e.to_string()))
        };
        let ledger_seq: Option<i64> = row
            .try_get("ledger_seq")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Some(LineageRow {
            artifact_id: row
                .try_get("artifact_id")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            decision_id: get_opt("decision_id")?,
            plan_id: get_opt("plan_id")?,
            catalyst_id: get_opt("catalyst_id")?,
            ledger_seq: ledger_seq.map(|s| s as u64),
        }))
    }
}

fn decode_value(row: &sqlx::sqlite::SqliteRow) -> StoreResult<serde_json::Value> {
    let raw: String = row
        .try_get("value")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(serde_json::from_str(&raw)?)
}

fn ledger_row_to_record(row: sqlx::sqlite::SqliteRow) -> StoreResult<LedgerRecord> {
    let backend = |e: sqlx::Error| StoreError::Backend(e.to_string());
    let seq: i64 = row.try_get("seq").map_err(backend)?;
    let timestamp: DateTime<Utc> = row.try_get("timestamp").map_err(backend)?;
    let op_kind_raw: String = row.try_get("op_kind").map_err(backend)?;
    let op_kind = OpKind::parse(&op_kind_raw).ok_or_else(|| {
        StoreError::Serialization(format!("unknown op kind `{op_kind_raw}`"))
    })?;
    let hash_field = |name: &str| -> StoreResult<ContentHash> {
        let raw: String = row.try_get(name).map_err(backend)?;
        ContentHash::from_hex(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
    };
    let payload_raw: String = row.try_get("payload").map_err(backend)?;
    Ok(LedgerRecord {
        entry: LedgerEntry {
            seq: seq as u64,
            timestamp,
            op_kind,
            payload_digest: hash_field("payload_digest")?,
            prev_hash: hash_field("prev_hash")?,
            hash: hash_field("hash")?,
        },
        payload: serde_json::from_str(&payload_raw)?,
    })
}

fn map_sqlx_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // SQLITE_BUSY / SQLITE_BUSY_SNAPSHOT: another process holds the write lock.
        let busy = matches!(db_err.code().as_deref(), Some("5") | Some("517"));
        if db_err.is_unique_violation() || busy {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

fn to_i64(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("sequence too large".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecordStoreExt;
    use serde_json::json;

    fn record(seq: u64, prev: ContentHash) -> LedgerRecord {
        let payload = json!({ "artifact_id": format!("art-{seq}") });
        let entry = LedgerEntry::chained(
            seq,
            OpKind::ArtifactPublished,
            ContentHash::of_json(&payload).unwrap(),
            prev,
        );
        LedgerRecord { entry, payload }
    }

    #[tokio::test]
    async fn ledger_roundtrip_and_conflict() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = record(0, ContentHash::zero());
        let second = record(1, first.entry.hash.clone());
        store.append(first.clone()).await.unwrap();
        store.append(second.clone()).await.unwrap();

        let err = store.append(record(1, ContentHash::zero())).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entry.hash, first.entry.hash);
        assert_eq!(all[1].payload, second.payload);
        assert_eq!(store.tip().await.unwrap().unwrap().seq, 1);
        assert_eq!(store.read_range(0, 1).await.unwrap().len(), 1);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn records_upsert_and_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put(Collection::Plans, "p2", json!({"n": 2})).await.unwrap();
        store.put(Collection::Plans, "p1", json!({"n": 1})).await.unwrap();
        store.put(Collection::Plans, "p2", json!({"n": 3})).await.unwrap();
        let values: Vec<serde_json::Value> = store.list_json(Collection::Plans).await.unwrap();
        assert_eq!(values, vec![json!({"n": 3}), json!({"n": 1})]);
        assert!(store.get(Collection::Plans, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lineage_view_joins_tables() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .put(
                Collection::Decisions,
                "dec-1",
                json!({ "plan_id": "plan-1", "catalyst_id": "cat-1" }),
            )
            .await
            .unwrap();
        store
            .put(Collection::Artifacts, "art-0", json!({ "decision_id": "dec-1" }))
            .await
            .unwrap();
        store.append(record(0, ContentHash::zero())).await.unwrap();

        let row = store.lineage_view("art-0").await.unwrap().unwrap();
        assert_eq!(row.decision_id.as_deref(), Some("dec-1"));
        assert_eq!(row.plan_id.as_deref(), Some("plan-1"));
        assert_eq!(row.catalyst_id.as_deref(), Some("cat-1"));
        assert_eq!(row.ledger_seq, Some(0));
    }

    #[tokio::test]
    async fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crucible.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.append(record(0, ContentHash::zero())).await.unwrap();
            store.pool().close().await;
        }
        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);
    }
}

use crate::error::{LedgerError, LedgerResult};
use crate::events::{ArtifactPublished, CatalystSelected, DecisionRecorded, PlanProposed};
use crucible_store::{CrucibleStore, StoreError};
use crucible_types::{ContentHash, LedgerEntry, LedgerRecord, OpKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Default bound on transparent retries of a colliding commit.
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 8;

/// Outcome of a successful chain verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub entries: u64,
    pub tip: Option<ContentHash>,
}

/// Full Catalyst -> Plan -> Decision -> Artifact chain for one artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub artifact: ArtifactPublished,
    pub decision: DecisionRecorded,
    pub plan: PlanProposed,
    pub catalyst: CatalystSelected,
    /// Sequence numbers of the four entries, artifact first.
    pub seqs: [u64; 4],
}

/// Append-only, hash-chained ledger.
///
/// `commit` is the only write path. Commits are serialized through an async
/// mutex so concurrent writers in one process never interleave between
/// reading the tip and appending; collisions with other processes surface as
/// store conflicts and are retried up to a bound.
pub struct Ledger {
    store: Arc<dyn CrucibleStore>,
    write_lock: Mutex<()>,
    max_commit_retries: u32,
}

impl Ledger {
    pub fn new(store: Arc<dyn CrucibleStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            max_commit_retries: DEFAULT_MAX_COMMIT_RETRIES,
        }
    }

    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    pub fn store(&self) -> &Arc<dyn CrucibleStore> {
        &self.store
    }

    /// Append an entry committing to `payload`.
    pub async fn commit<T>(&self, op_kind: OpKind, payload: &T) -> LedgerResult<LedgerEntry>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(payload)?;
        let payload_digest = ContentHash::of_json(&payload)?;

        let _guard = self.write_lock.lock().await;
        let mut attempts = 0u32;
        loop {
            let tip = self.store.tip().await?;
            let (seq, prev_hash) = match tip {
                Some(tip) => (tip.seq + 1, tip.hash),
                None => (0, ContentHash::zero()),
            };
            let entry = LedgerEntry::chained(seq, op_kind, payload_digest.clone(), prev_hash);
            let record = LedgerRecord {
                entry: entry.clone(),
                payload: payload.clone(),
            };
            match self.store.append(record).await {
                Ok(()) => {
                    debug!(seq, op = %op_kind, hash = %entry.hash.short(), "ledger commit");
                    return Ok(entry);
                }
                Err(StoreError::Conflict(reason)) => {
                    attempts += 1;
                    if attempts > self.max_commit_retries {
                        error!(attempts, op = %op_kind, "ledger commit retries exhausted");
                        return Err(LedgerError::Concurrency { attempts });
                    }
                    warn!(attempts, %reason, "ledger write collision, retrying");
                    tokio::task::yield_now().await;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Recompute every hash from entry 0.
    pub async fn verify_chain(&self) -> LedgerResult<ChainReport> {
        let records = self.store.read_all().await?;
        let mut prev = ContentHash::zero();
        for (index, record) in records.iter().enumerate() {
            let entry = &record.entry;
            if entry.seq != index as u64 {
                return Err(integrity(entry.seq, format!("expected seq {index}")));
            }
            if entry.prev_hash != prev {
                return Err(integrity(entry.seq, "prev_hash does not link".into()));
            }
            if entry.recompute_hash() != entry.hash {
                return Err(integrity(entry.seq, "hash mismatch".into()));
            }
            prev = entry.hash.clone();
        }
        Ok(ChainReport {
            entries: records.len() as u64,
            tip: records.last().map(|r| r.entry.hash.clone()),
        })
    }

    /// Re-derive every retained payload's digest.
    pub async fn audit_payloads(&self) -> LedgerResult<u64> {
        let records = self.store.read_all().await?;
        for record in &records {
            if ContentHash::of_json(&record.payload)? != record.entry.payload_digest {
                error!(seq = record.entry.seq, "payload digest mismatch");
                return Err(LedgerError::PayloadMismatch {
                    seq: record.entry.seq,
                });
            }
        }
        Ok(records.len() as u64)
    }

    pub async fn records(&self) -> LedgerResult<Vec<LedgerRecord>> {
        Ok(self.store.read_all().await?)
    }

    pub async fn records_of(&self, op_kind: OpKind) -> LedgerResult<Vec<LedgerRecord>> {
        Ok(self
            .store
            .read_all()
            .await?
            .into_iter()
            .filter(|r| r.entry.op_kind == op_kind)
            .collect())
    }

    pub async fn tip(&self) -> LedgerResult<Option<LedgerEntry>> {
        Ok(self.store.tip().await?)
    }

    pub async fn len(&self) -> LedgerResult<u64> {
        Ok(self.store.len().await?)
    }

    pub async fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Walk back from an artifact to the catalyst that started its cycle.
    pub async fn lineage(&self, artifact_id: &str) -> LedgerResult<Lineage> {
        let records = self.store.read_all().await?;

        let (artifact_seq, artifact): (u64, ArtifactPublished) =
            find_latest(&records, OpKind::ArtifactPublished, |p: &ArtifactPublished| {
                p.artifact_id.as_str() == artifact_id
            })?
            .ok_or_else(|| LedgerError::UnknownArtifact(artifact_id.to_string()))?;

        let (decision_seq, decision): (u64, DecisionRecorded) =
            find_latest(&records, OpKind::DecisionRecorded, |p: &DecisionRecorded| {
                p.decision_id == artifact.decision_id
            })?
            .ok_or_else(|| broken("decision", artifact.decision_id.as_str()))?;

        let (plan_seq, plan): (u64, PlanProposed) =
            find_latest(&records, OpKind::PlanProposed, |p: &PlanProposed| {
                p.plan_id == decision.plan_id
            })?
            .ok_or_else(|| broken("plan", decision.plan_id.as_str()))?;

        let (catalyst_seq, catalyst): (u64, CatalystSelected) =
            find_latest(&records, OpKind::CatalystSelected, |p: &CatalystSelected| {
                p.catalyst_id == plan.catalyst_id
            })?
            .ok_or_else(|| broken("catalyst", plan.catalyst_id.as_str()))?;

        let ordered = artifact_seq > decision_seq && decision_seq > plan_seq && plan_seq > catalyst_seq;
        if !ordered {
            return Err(LedgerError::LineageBroken(format!(
                "entries for artifact {artifact_id} are out of order"
            )));
        }

        Ok(Lineage {
            artifact,
            decision,
            plan,
            catalyst,
            seqs: [artifact_seq, decision_seq, plan_seq, catalyst_seq],
        })
    }
}

fn integrity(seq: u64, reason: String) -> LedgerError {
    error!(seq, %reason, "ledger integrity violation");
    LedgerError::Integrity { seq, reason }
}

fn broken(what: &str, id: &str) -> LedgerError {
    LedgerError::LineageBroken(format!("no {what} entry for {id}"))
}

/// Latest entry of `op_kind` whose typed payload matches.
fn find_latest<T, F>(
    records: &[LedgerRecord],
    op_kind: OpKind,
    matches: F,
) -> LedgerResult<Option<(u64, T)>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    for record in records.iter().rev() {
        if record.entry.op_kind != op_kind {
            continue;
        }
        let payload: T = serde_json::from_value(record.payload.clone())?;
        if matches(&payload) {
            return Ok(Some((record.entry.seq, payload)));
        }
    }
    Ok(None)
}

use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of operation recorded in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    CatalystSelected,
    PlanProposed,
    PlanRejected,
    DecisionRecorded,
    ArtifactPublished,
    ValidationFailed,
    HeuristicWritten,
    HeuristicReinforced,
    HeuristicSynthesized,
    HeuristicDecayed,
    VowDeclared,
    VowAdherence,
    VowLiberated,
    ScaffoldDeclared,
    ScaffoldTransition,
    GenesisPass,
    MetricsSnapshot,
    CycleAborted,
    CycleCompleted,
    Halted,
    AuditCleared,
    SelfTest,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalystSelected => "catalyst_selected",
            Self::PlanProposed => "plan_proposed",
            Self::PlanRejected => "plan_rejected",
            Self::DecisionRecorded => "decision_recorded",
            Self::ArtifactPublished => "artifact_published",
            Self::ValidationFailed => "validation_failed",
            Self::HeuristicWritten => "heuristic_written",
            Self::HeuristicReinforced => "heuristic_reinforced",
            Self::HeuristicSynthesized => "heuristic_synthesized",
            Self::HeuristicDecayed => "heuristic_decayed",
            Self::VowDeclared => "vow_declared",
            Self::VowAdherence => "vow_adherence",
            Self::VowLiberated => "vow_liberated",
            Self::ScaffoldDeclared => "scaffold_declared",
            Self::ScaffoldTransition => "scaffold_transition",
            Self::GenesisPass => "genesis_pass",
            Self::MetricsSnapshot => "metrics_snapshot",
            Self::CycleAborted => "cycle_aborted",
            Self::CycleCompleted => "cycle_completed",
            Self::Halted => "halted",
            Self::AuditCleared => "audit_cleared",
            Self::SelfTest => "self_test",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        const ALL: [OpKind; 22] = [
            OpKind::CatalystSelected,
            OpKind::PlanProposed,
            OpKind::PlanRejected,
            OpKind::DecisionRecorded,
            OpKind::ArtifactPublished,
            OpKind::ValidationFailed,
            OpKind::HeuristicWritten,
            OpKind::HeuristicReinforced,
            OpKind::HeuristicSynthesized,
            OpKind::HeuristicDecayed,
            OpKind::VowDeclared,
            OpKind::VowAdherence,
            OpKind::VowLiberated,
            OpKind::ScaffoldDeclared,
            OpKind::ScaffoldTransition,
            OpKind::GenesisPass,
            OpKind::MetricsSnapshot,
            OpKind::CycleAborted,
            OpKind::CycleCompleted,
            OpKind::Halted,
            OpKind::AuditCleared,
            OpKind::SelfTest,
        ];
        ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hash-chained ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub op_kind: OpKind,
    pub payload_digest: ContentHash,
    pub prev_hash: ContentHash,
    pub hash: ContentHash,
}

impl LedgerEntry {
    /// Build the entry following `prev_hash` at `seq`.
    pub fn chained(
        seq: u64,
        op_kind: OpKind,
        payload_digest: ContentHash,
        prev_hash: ContentHash,
    ) -> Self {
        let hash = compute_hash(&prev_hash, seq, op_kind, &payload_digest);
        Self {
            seq,
            timestamp: Utc::now(),
            op_kind,
            payload_digest,
            prev_hash,
            hash,
        }
    }

    /// Recompute this entry's hash from its fields.
    pub fn recompute_hash(&self) -> ContentHash {
        compute_hash(&self.prev_hash, self.seq, self.op_kind, &self.payload_digest)
    }
}

/// An entry together with the canonical payload it commits to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub entry: LedgerEntry,
    pub payload: serde_json::Value,
}

/// `H(prev_hash || seq || op_kind || payload_digest)`.
pub fn compute_hash(
    prev_hash: &ContentHash,
    seq: u64,
    op_kind: OpKind,
    payload_digest: &ContentHash,
) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(&seq.to_be_bytes());
    hasher.update(op_kind.as_str().as_bytes());
    hasher.update(payload_digest.as_bytes());
    ContentHash::from_bytes(*hasher.finalize().as_bytes())
}

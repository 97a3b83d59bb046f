//! Payloads of the ledger entries that form the audit lineage.
//!
//! Other operations commit free-form payloads; these four are typed because
//! [`crate::Ledger::lineage`] walks them.

use crucible_types::{
    ArtifactId, ArtifactKind, CatalystId, ContentHash, Cycle, DecisionId, PlanId,
    ResolvedConflict, StreamId,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalystSelected {
    pub catalyst_id: CatalystId,
    pub stream: StreamId,
    pub cycle: Cycle,
    pub severity: f64,
    pub domain_tag: String,
    pub internal: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanProposed {
    pub plan_id: PlanId,
    pub catalyst_id: CatalystId,
    pub stream: StreamId,
    pub cycle: Cycle,
    pub confidence: f64,
    pub novelty: f64,
    pub attempt: u32,
    pub resolved_conflict: Option<ResolvedConflict>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecorded {
    pub decision_id: DecisionId,
    pub plan_id: PlanId,
    pub catalyst_id: CatalystId,
    pub accepted: bool,
    pub threshold_used: f64,
    pub retries_consumed: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPublished {
    pub artifact_id: ArtifactId,
    pub decision_id: DecisionId,
    pub plan_id: PlanId,
    pub catalyst_id: CatalystId,
    pub kind: ArtifactKind,
    pub digest: ContentHash,
    pub signature: String,
}

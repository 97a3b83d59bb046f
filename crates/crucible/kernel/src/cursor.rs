//! Persisted position of one catalyst stream in the cycle state machine,
//! and the queue of internal catalysts waiting for a SCAN.

use crate::error::KernelResult;
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt};
use crucible_types::{
    ArtifactId, Catalyst, CatalystId, ContentHash, Cycle, DecisionId, PlanId, StreamId, VowId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    #[default]
    Scan,
    Architect,
    Execute,
    Integrate,
    Halted,
}

impl CycleState {
    /// The state an uninterrupted cycle moves to next. INTEGRATE may also
    /// halt; HALTED never moves.
    pub fn next(&self) -> CycleState {
        match self {
            Self::Scan => Self::Architect,
            Self::Architect => Self::Execute,
            Self::Execute => Self::Integrate,
            Self::Integrate => Self::Scan,
            Self::Halted => Self::Halted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted)
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scan => "SCAN",
            Self::Architect => "ARCHITECT",
            Self::Execute => "EXECUTE",
            Self::Integrate => "INTEGRATE",
            Self::Halted => "HALTED",
        };
        f.write_str(s)
    }
}

/// Where a stream stands. Everything an individual CLI command needs to
/// advance one state lives here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub stream: StreamId,
    /// Last cycle started by a successful SCAN.
    pub cycle: Cycle,
    pub state: CycleState,
    #[serde(default)]
    pub catalyst: Option<Catalyst>,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    #[serde(default)]
    pub decision_id: Option<DecisionId>,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub artifact_ids: Vec<ArtifactId>,
    #[serde(default)]
    pub violated_vows: Vec<VowId>,
    /// ARCHITECT attempts lost to novelty violations this cycle.
    #[serde(default)]
    pub novelty_retries: u32,
    #[serde(default)]
    pub last_genesis_cycle: Option<Cycle>,
    #[serde(default)]
    pub audit_required: bool,
    #[serde(default)]
    pub evidence_digest: Option<ContentHash>,
}

impl Cursor {
    pub fn new(stream: StreamId) -> Self {
        Self {
            stream,
            cycle: 0,
            state: CycleState::Scan,
            catalyst: None,
            plan_id: None,
            decision_id: None,
            accepted: false,
            artifact_ids: Vec::new(),
            violated_vows: Vec::new(),
            novelty_retries: 0,
            last_genesis_cycle: None,
            audit_required: false,
            evidence_digest: None,
        }
    }

    fn key(stream: &StreamId) -> String {
        format!("cursor:{stream}")
    }

    pub async fn load(ledger: &Ledger, stream: &StreamId) -> KernelResult<Self> {
        Ok(ledger
            .store()
            .get_json(Collection::KernelState, &Self::key(stream))
            .await?
            .unwrap_or_else(|| Self::new(stream.clone())))
    }

    pub async fn save(&self, ledger: &Ledger) -> KernelResult<()> {
        ledger
            .store()
            .put_json(Collection::KernelState, &Self::key(&self.stream), self)
            .await?;
        Ok(())
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_terminal()
    }

    /// Drop everything the current cycle was carrying and wait for SCAN.
    /// The cycle counter is kept.
    pub fn reset(&mut self) {
        self.state = CycleState::Scan;
        self.catalyst = None;
        self.plan_id = None;
        self.decision_id = None;
        self.accepted = false;
        self.artifact_ids.clear();
        self.violated_vows.clear();
        self.novelty_retries = 0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalystStatus {
    Pending,
    Consumed,
}

/// A catalyst in the internal queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalystRecord {
    pub catalyst: Catalyst,
    pub status: CatalystStatus,
    #[serde(default)]
    pub consumed_by: Option<StreamId>,
    #[serde(default)]
    pub consumed_at_cycle: Option<Cycle>,
}

impl CatalystRecord {
    pub fn pending(catalyst: Catalyst) -> Self {
        Self {
            catalyst,
            status: CatalystStatus::Pending,
            consumed_by: None,
            consumed_at_cycle: None,
        }
    }

    /// An external catalyst, recorded as it is selected.
    pub fn consumed(catalyst: Catalyst, stream: StreamId, cycle: Cycle) -> Self {
        Self {
            catalyst,
            status: CatalystStatus::Consumed,
            consumed_by: Some(stream),
            consumed_at_cycle: Some(cycle),
        }
    }
}

/// Queue a freshly raised internal catalyst.
pub async fn enqueue(ledger: &Ledger, catalyst: &Catalyst) -> KernelResult<()> {
    ledger
        .store()
        .put_json(
            Collection::Catalysts,
            catalyst.id.as_str(),
            &CatalystRecord::pending(catalyst.clone()),
        )
        .await?;
    Ok(())
}

/// Internal catalysts not yet selected by any stream, oldest first.
pub async fn pending(ledger: &Ledger) -> KernelResult<Vec<Catalyst>> {
    let mut records: Vec<CatalystRecord> = ledger.store().list_json(Collection::Catalysts).await?;
    records.retain(|r| r.status == CatalystStatus::Pending);
    records.sort_by(|a, b| {
        a.catalyst
            .observed_at
            .cmp(&b.catalyst.observed_at)
            .then_with(|| a.catalyst.id.cmp(&b.catalyst.id))
    });
    Ok(records.into_iter().map(|r| r.catalyst).collect())
}

/// Mark a queued catalyst consumed. Returns false when another stream got
/// there first; callers serialize claims so the read and write agree.
pub async fn mark_consumed(
    ledger: &Ledger,
    id: &CatalystId,
    stream: &StreamId,
    cycle: Cycle,
) -> KernelResult<bool> {
    let store = ledger.store();
    let Some(mut record) = store
        .get_json::<CatalystRecord>(Collection::Catalysts, id.as_str())
        .await?
    else {
        return Ok(false);
    };
    if record.status == CatalystStatus::Consumed {
        return Ok(false);
    }
    record.status = CatalystStatus::Consumed;
    record.consumed_by = Some(stream.clone());
    record.consumed_at_cycle = Some(cycle);
    store
        .put_json(Collection::Catalysts, id.as_str(), &record)
        .await?;
    Ok(true)
}

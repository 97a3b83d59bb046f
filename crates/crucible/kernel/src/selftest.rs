//! Built-in self tests.
//!
//! Every check runs against a scratch in-memory store so it cannot disturb
//! live state; `chain`, `digest` and `metrics` also inspect the live store
//! read-only. Saving a report is the only write to the live ledger.

use crate::error::{KernelError, KernelResult};
use crate::runtime::Crucible;
use chrono::{DateTime, TimeZone, Utc};
use crucible_foundry::{hash, verify_artifact};
use crucible_ledger::events::DecisionRecorded;
use crucible_ledger::Ledger;
use crucible_metrics::{MetricsEngine, StopRuleConfig};
use crucible_scaffold::{ScaffoldConfig, ScaffoldManager};
use crucible_scanner::{select, SignalRecord};
use crucible_store::{Collection, InMemoryStore, RecordStoreExt};
use crucible_types::{
    AgentOutputs, Artifact, CatalystId, ContentHash, Decision, DecisionId, ErrorClass,
    LedgerEntry, OpKind, Plan, PlanId, ResolvedConflict, RoleKind, RoleOutput, ScaffoldState,
    Stance,
};
use crucible_vows::{VowError, VowRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelfTestId {
    Chain,
    Digest,
    TieBreak,
    VowGate,
    NonCollusion,
    Metrics,
    Scaffold,
    All,
}

impl SelfTestId {
    /// Every individual check, in the order `all` runs them.
    pub const CHECKS: [SelfTestId; 7] = [
        SelfTestId::Chain,
        SelfTestId::Digest,
        SelfTestId::TieBreak,
        SelfTestId::VowGate,
        SelfTestId::NonCollusion,
        SelfTestId::Metrics,
        SelfTestId::Scaffold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Digest => "digest",
            Self::TieBreak => "tie-break",
            Self::VowGate => "vow-gate",
            Self::NonCollusion => "non-collusion",
            Self::Metrics => "metrics",
            Self::Scaffold => "scaffold",
            Self::All => "all",
        }
    }
}

impl fmt::Display for SelfTestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelfTestId {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CHECKS
            .into_iter()
            .chain([Self::All])
            .find(|id| id.as_str() == s)
            .ok_or_else(|| KernelError::UnknownSelfTest(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: SelfTestId,
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

fn check(id: SelfTestId, name: &str, passed: bool, detail: impl Into<String>) -> CheckResult {
    CheckResult {
        id,
        name: name.to_string(),
        passed,
        detail: detail.into(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub requested: SelfTestId,
    pub checks: Vec<CheckResult>,
    pub passed: bool,
    pub ran_at: DateTime<Utc>,
}

impl SelfTestReport {
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// A failed chain or digest check is an integrity error; any other
    /// failure is a validation error.
    pub fn into_result(self) -> KernelResult<Self> {
        if self.passed {
            return Ok(self);
        }
        let integrity = self
            .failures()
            .any(|c| matches!(c.id, SelfTestId::Chain | SelfTestId::Digest));
        Err(KernelError::SelfTestFailed {
            failed: self.failures().map(|c| format!("{}: {}", c.id, c.name)).collect(),
            class: if integrity {
                ErrorClass::IntegrityError
            } else {
                ErrorClass::ValidationError
            },
        })
    }
}

fn scratch() -> (Arc<InMemoryStore>, Arc<Ledger>) {
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(Ledger::new(store.clone()));
    (store, ledger)
}

/// Run one named check, or all of them.
pub async fn run(crucible: &Crucible, id: SelfTestId) -> KernelResult<SelfTestReport> {
    let ids: Vec<SelfTestId> = match id {
        SelfTestId::All => SelfTestId::CHECKS.to_vec(),
        one => vec![one],
    };
    let mut checks = Vec::new();
    for id in ids {
        let mut results = match id {
            SelfTestId::Chain => chain(crucible).await?,
            SelfTestId::Digest => digest(crucible).await?,
            SelfTestId::TieBreak => tie_break(),
            SelfTestId::VowGate => vow_gate().await?,
            SelfTestId::NonCollusion => non_collusion(),
            SelfTestId::Metrics => metrics(crucible).await?,
            SelfTestId::Scaffold => scaffold().await?,
            SelfTestId::All => Vec::new(),
        };
        checks.append(&mut results);
    }
    let passed = checks.iter().all(|c| c.passed);
    let report = SelfTestReport {
        requested: id,
        checks,
        passed,
        ran_at: Utc::now(),
    };
    if passed {
        info!(test = %id, checks = report.checks.len(), "self test passed");
    } else {
        warn!(test = %id, failed = report.failures().count(), "self test failed");
    }
    Ok(report)
}

/// Commit a report to the live ledger.
pub async fn save(crucible: &Crucible, report: &SelfTestReport) -> KernelResult<LedgerEntry> {
    Ok(crucible.ledger.commit(OpKind::SelfTest, report).await?)
}

async fn chain(crucible: &Crucible) -> KernelResult<Vec<CheckResult>> {
    let id = SelfTestId::Chain;
    let (store, ledger) = scratch();
    for probe in 0..3 {
        ledger.commit(OpKind::SelfTest, &json!({ "probe": probe })).await?;
    }
    let intact = ledger.verify_chain().await.is_ok();
    store.tamper_with(1, |record| record.entry.hash = ContentHash::hash(b"tampered"))?;
    let detected = ledger.verify_chain().await.is_err();

    let mut out = vec![check(
        id,
        "scratch chain verifies and detects a rewritten hash",
        intact && detected,
        format!("intact={intact} tamper_detected={detected}"),
    )];

    let live = match crucible.ledger.verify_chain().await {
        Ok(report) => check(id, "live chain verifies", true, format!("{} entries", report.entries)),
        Err(e) if e.class() == ErrorClass::IntegrityError => {
            check(id, "live chain verifies", false, e.to_string())
        }
        Err(e) => return Err(e.into()),
    };
    out.push(live);

    let payloads = match crucible.ledger.audit_payloads().await {
        Ok(n) => check(id, "live payload digests match", true, format!("{n} payloads")),
        Err(e) if e.class() == ErrorClass::IntegrityError => {
            check(id, "live payload digests match", false, e.to_string())
        }
        Err(e) => return Err(e.into()),
    };
    out.push(payloads);
    Ok(out)
}

async fn digest(crucible: &Crucible) -> KernelResult<Vec<CheckResult>> {
    let id = SelfTestId::Digest;
    let content = "# spec: digest probe\n\n## Rationale\nstable input\n";
    let first = hash(content);
    let round_trip = ContentHash::from_hex(&first.to_hex()).is_ok_and(|d| d == first);
    let stable = hash(content) == first;
    let sensitive = hash(&content.replace("stable", "stable.")) != first;

    let mut out = vec![check(
        id,
        "digest is deterministic and content addressed",
        round_trip && stable && sensitive,
        format!("round_trip={round_trip} stable={stable} sensitive={sensitive}"),
    )];

    let artifacts: Vec<Artifact> = crucible
        .ledger
        .store()
        .list_json(Collection::Artifacts)
        .await?;
    let bad: Vec<String> = artifacts
        .iter()
        .filter(|a| !verify_artifact(a))
        .map(|a| a.id.to_string())
        .collect();
    out.push(check(
        id,
        "live artifacts re-derive their digests and signatures",
        bad.is_empty(),
        if bad.is_empty() {
            format!("{} artifacts", artifacts.len())
        } else {
            format!("mismatch: {}", bad.join(", "))
        },
    ));
    Ok(out)
}

fn tie_break() -> Vec<CheckResult> {
    let earlier = Utc.timestamp_opt(1_000, 0).single().unwrap_or_default();
    let later = Utc.timestamp_opt(2_000, 0).single().unwrap_or_default();
    let a = SignalRecord::new(0.5, "probe", later, "later signal");
    let b = SignalRecord::new(0.5, "probe", earlier, "earlier signal");

    let forward = vec![a.clone(), b.clone()];
    let backward = vec![b, a];
    let picks: Vec<Option<DateTime<Utc>>> = [forward, backward]
        .iter()
        .map(|records| select(records).ok().map(|r| r.observed_at))
        .collect();
    let passed = picks.iter().all(|p| *p == Some(earlier));
    vec![check(
        SelfTestId::TieBreak,
        "equal severity selects the earlier signal in any order",
        passed,
        format!("picked {picks:?}"),
    )]
}

async fn vow_gate() -> KernelResult<Vec<CheckResult>> {
    let id = SelfTestId::VowGate;
    let (_, ledger) = scratch();
    let registry = VowRegistry::new(ledger);
    let vow = registry.declare_vow("always cite evidence", 3, 0).await?;

    let early = registry
        .request_liberation(&vow.id, "the evidence rule is superseded by review policy", 2)
        .await;
    let early_rejected = matches!(early, Err(VowError::TooEarly { .. }));
    let empty = registry.request_liberation(&vow.id, "  ", 3).await;
    let empty_rejected = matches!(empty, Err(VowError::EmptyJustification));
    let on_time = registry
        .request_liberation(&vow.id, "superseded by review policy", 3)
        .await
        .is_ok_and(|v| v.liberated);

    Ok(vec![check(
        id,
        "liberation waits for min_cycles and needs a justification",
        early_rejected && empty_rejected && on_time,
        format!("early_rejected={early_rejected} empty_rejected={empty_rejected} on_time={on_time}"),
    )])
}

fn probe_plan(conflict: Option<ResolvedConflict>) -> Plan {
    let output = |role, stance| RoleOutput::new(role, stance, format!("{role} probe"), 0.8);
    Plan {
        id: PlanId::generate(),
        catalyst_id: CatalystId::generate(),
        cycle: 0,
        thesis: "probe thesis".into(),
        antithesis: None,
        synthesis_text: "probe synthesis".into(),
        confidence: 0.9,
        agent_outputs: AgentOutputs {
            innovator: output(RoleKind::Innovator, Stance::Propose),
            falsifier: output(RoleKind::Falsifier, Stance::Object),
            narrator: output(RoleKind::Narrator, Stance::Approve),
            provocateur: output(RoleKind::Provocateur, Stance::Question).with_novelty(1.0),
        },
        resolved_conflict: conflict,
        attempt: 0,
        created_at: Utc::now(),
    }
}

fn non_collusion() -> Vec<CheckResult> {
    let unresolved = Decision::try_from_plan(&probe_plan(None), 0.5, 0).is_err();
    let resolved = Decision::try_from_plan(
        &probe_plan(Some(ResolvedConflict {
            agent_a: RoleKind::Innovator,
            agent_b: RoleKind::Falsifier,
            description: "probe conflict".into(),
        })),
        0.5,
        0,
    )
    .is_ok();
    vec![check(
        SelfTestId::NonCollusion,
        "a plan without a resolved conflict never becomes a decision",
        unresolved && resolved,
        format!("unresolved_rejected={unresolved} resolved_accepted={resolved}"),
    )]
}

async fn metrics(crucible: &Crucible) -> KernelResult<Vec<CheckResult>> {
    let id = SelfTestId::Metrics;
    let (_, ledger) = scratch();
    for (n, accepted) in [true, false, true].into_iter().enumerate() {
        ledger
            .commit(
                OpKind::DecisionRecorded,
                &DecisionRecorded {
                    decision_id: DecisionId::new(format!("dec-probe-{n}")),
                    plan_id: PlanId::new(format!("plan-probe-{n}")),
                    catalyst_id: CatalystId::new(format!("cat-probe-{n}")),
                    accepted,
                    threshold_used: 0.7,
                    retries_consumed: 0,
                },
            )
            .await?;
    }
    let engine = MetricsEngine::new(ledger, StopRuleConfig::default());
    let a = engine.snapshot(3, &[], &[]).await?;
    let b = engine.snapshot(3, &[], &[]).await?;
    let scratch_ok = a.bit_identical(&b);

    let cycle = crucible.metrics.latest().await?.map_or(0, |s| s.cycle);
    let heuristics = crucible.heuristics.all()?;
    let scaffolds = crucible.scaffolds.all()?;
    let x = crucible.metrics.snapshot(cycle, &heuristics, &scaffolds).await?;
    let y = crucible.metrics.snapshot(cycle, &heuristics, &scaffolds).await?;
    let live_ok = x.bit_identical(&y);

    Ok(vec![
        check(id, "scratch snapshot is bit-identical on recompute", scratch_ok, format!("{:?}", a.scores)),
        check(id, "live snapshot is bit-identical on recompute", live_ok, format!("cycle {cycle}")),
    ])
}

async fn scaffold() -> KernelResult<Vec<CheckResult>> {
    let id = SelfTestId::Scaffold;
    let (_, ledger) = scratch();
    let manager = ScaffoldManager::new(ledger, ScaffoldConfig::default());
    let a = manager.declare("always log retries", Some(5), 1).await?;
    let b = manager.declare("never log retries", Some(5), 1).await?;
    let report = manager.pass(1, &[]).await?;

    let solidified = manager.get(&a.id)?.state == ScaffoldState::Solidify
        && manager.get(&b.id)?.state == ScaffoldState::Solidify;
    let one_catalyst = report.catalysts.len() == 1;
    Ok(vec![check(
        id,
        "contradictory scaffolds solidify and raise one catalyst",
        solidified && one_catalyst,
        format!("solidified={solidified} catalysts={}", report.catalysts.len()),
    )])
}

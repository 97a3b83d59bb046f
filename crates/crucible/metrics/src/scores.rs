use crucible_ledger::events::{ArtifactPublished, DecisionRecorded, PlanProposed};
use crucible_scaffold::stability_ratio;
use crucible_types::{
    score, ArtifactId, Cycle, DecisionId, Heuristic, HeuristicSource, LedgerRecord,
    MetricsSnapshot, OpKind, Scaffold, VowId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// One plan as the metrics see it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanFact {
    pub cycle: Cycle,
    pub confidence: f64,
    pub novelty: f64,
}

/// A recorded vow liberation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liberation {
    pub vow_id: VowId,
    pub cycle: Cycle,
    pub justification: String,
}

/// Counts and series extracted from the ledger, in ledger order.
#[derive(Clone, Debug, Default)]
pub struct LedgerFacts {
    pub decisions: u64,
    pub accepted: u64,
    pub plans: Vec<PlanFact>,
    pub vows_declared: u64,
    pub liberations: Vec<Liberation>,
    pub reinforced_cycles: Vec<Cycle>,
    pub artifacts: Vec<ArtifactId>,
    pub(crate) published: BTreeSet<DecisionId>,
    pub(crate) failed: BTreeSet<DecisionId>,
}

#[derive(Deserialize)]
struct Reinforced {
    cycle: Cycle,
}

#[derive(Deserialize)]
struct Failed {
    decision_id: DecisionId,
}

fn decode<T: DeserializeOwned>(record: &LedgerRecord) -> Option<T> {
    match serde_json::from_value(record.payload.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(seq = record.entry.seq, op = %record.entry.op_kind.as_str(), error = %e, "skipping undecodable payload");
            None
        }
    }
}

impl LedgerFacts {
    pub fn from_records(records: &[LedgerRecord]) -> Self {
        let mut facts = Self::default();
        for record in records {
            match record.entry.op_kind {
                OpKind::DecisionRecorded => {
                    if let Some(d) = decode::<DecisionRecorded>(record) {
                        facts.decisions += 1;
                        facts.accepted += u64::from(d.accepted);
                    }
                }
                OpKind::PlanProposed => {
                    if let Some(p) = decode::<PlanProposed>(record) {
                        facts.plans.push(PlanFact {
                            cycle: p.cycle,
                            confidence: p.confidence,
                            novelty: p.novelty,
                        });
                    }
                }
                OpKind::VowDeclared => facts.vows_declared += 1,
                OpKind::VowLiberated => {
                    if let Some(l) = decode::<Liberation>(record) {
                        facts.liberations.push(l);
                    }
                }
                OpKind::HeuristicReinforced => {
                    if let Some(r) = decode::<Reinforced>(record) {
                        facts.reinforced_cycles.push(r.cycle);
                    }
                }
                OpKind::ArtifactPublished => {
                    if let Some(a) = decode::<ArtifactPublished>(record) {
                        facts.published.insert(a.decision_id);
                        facts.artifacts.push(a.artifact_id);
                    }
                }
                OpKind::ValidationFailed => {
                    if let Some(f) = decode::<Failed>(record) {
                        facts.failed.insert(f.decision_id);
                    }
                }
                _ => {}
            }
        }
        facts
    }

    pub fn acceptance_rate(&self) -> f64 {
        ratio(self.accepted, self.decisions)
    }

    /// Mean Provocateur novelty over every proposed plan.
    pub fn novelty_rate(&self) -> f64 {
        if self.plans.is_empty() {
            return 0.0;
        }
        self.plans.iter().map(|p| p.novelty).sum::<f64>() / self.plans.len() as f64
    }

    pub fn vow_liberation_rate(&self) -> f64 {
        ratio(self.liberations.len() as u64, self.vows_declared)
    }

    /// Share of compiled decisions that passed the foundry gate.
    pub fn fidelity(&self) -> f64 {
        let attempted = self.published.union(&self.failed).count() as u64;
        let clean = self.published.difference(&self.failed).count() as u64;
        ratio(clean, attempted)
    }

    /// Whether any heuristic was reinforced in `(cycle - window, cycle]`.
    pub fn reinforced_within(&self, cycle: Cycle, window: u64) -> bool {
        let floor = cycle.saturating_sub(window);
        self.reinforced_cycles.iter().any(|&c| c > floor && c <= cycle)
    }

    /// Highest Provocateur novelty among plans in `(cycle - window, cycle]`.
    pub fn best_novelty_within(&self, cycle: Cycle, window: u64) -> Option<f64> {
        let floor = cycle.saturating_sub(window);
        self.plans
            .iter()
            .filter(|p| p.cycle > floor && p.cycle <= cycle)
            .map(|p| p.novelty)
            .reduce(f64::max)
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Share of class-level genesis heuristics that were later reinforced.
pub fn genesis_reproduction_rate(heuristics: &[Heuristic]) -> f64 {
    let class_level: Vec<&Heuristic> = heuristics
        .iter()
        .filter(|h| h.source == HeuristicSource::Genesis { pass: 3 })
        .collect();
    let reproduced = class_level.iter().filter(|h| h.reinforcements > 0).count();
    ratio(reproduced as u64, class_level.len() as u64)
}

pub fn mean_live_confidence(heuristics: &[Heuristic]) -> f64 {
    let live: Vec<f64> = heuristics
        .iter()
        .filter(|h| h.status.is_live())
        .map(|h| h.confidence)
        .collect();
    if live.is_empty() {
        0.0
    } else {
        live.iter().sum::<f64>() / live.len() as f64
    }
}

/// The composite scores for `cycle`. A pure function of its inputs.
pub fn compute_snapshot(
    cycle: Cycle,
    facts: &LedgerFacts,
    heuristics: &[Heuristic],
    scaffolds: &[Scaffold],
) -> MetricsSnapshot {
    MetricsSnapshot::new(cycle)
        .with_score(score::ACCEPTANCE_RATE, facts.acceptance_rate())
        .with_score(score::NOVELTY_RATE, facts.novelty_rate())
        .with_score(score::SCAFFOLD_STABILITY, stability_ratio(scaffolds))
        .with_score(score::VOW_LIBERATION_RATE, facts.vow_liberation_rate())
        .with_score(
            score::GENESIS_REPRODUCTION_RATE,
            genesis_reproduction_rate(heuristics),
        )
        .with_score(score::FIDELITY, facts.fidelity())
        .with_score(
            score::HEURISTIC_MEAN_CONFIDENCE,
            mean_live_confidence(heuristics),
        )
}

/// Plateau: the last `window` plan confidences spread less than `epsilon`,
/// or nothing was reinforced over the last `window` cycles.
pub fn detect_plateau(facts: &LedgerFacts, cycle: Cycle, window: u64, epsilon: f64) -> bool {
    let window_len = window.max(1) as usize;
    if facts.plans.len() >= window_len {
        let recent = &facts.plans[facts.plans.len() - window_len..];
        let (lo, hi) = recent.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.confidence), hi.max(p.confidence))
        });
        if hi - lo < epsilon {
            return true;
        }
    }
    cycle >= window && !facts.reinforced_within(cycle, window)
}

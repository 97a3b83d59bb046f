use crate::error::{HeuristicError, HeuristicResult};
use crucible_types::{Cycle, Heuristic, HeuristicId, HeuristicSource, HeuristicStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Mutable lifecycle fields guarded by a per-heuristic lock.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    pub status: HeuristicStatus,
    pub conflicts: Vec<HeuristicId>,
    pub superseded_by: Option<HeuristicId>,
}

/// One arena slot.
///
/// Confidence and recency are atomics so DECAY applies without taking the
/// lifecycle lock. REINFORCE holds it while raising confidence, and SYNTHESIZE
/// holds the lock of both parents while checking them against the floor.
#[derive(Debug)]
pub(crate) struct HeuristicCell {
    pub id: HeuristicId,
    pub principle: String,
    pub origin_cycle: Cycle,
    pub source: HeuristicSource,
    confidence_bits: AtomicU64,
    last_touched: AtomicU64,
    reinforcements: AtomicU64,
    lifecycle: Mutex<Lifecycle>,
}

impl HeuristicCell {
    pub fn new(
        id: HeuristicId,
        principle: String,
        confidence: f64,
        cycle: Cycle,
        source: HeuristicSource,
        status: HeuristicStatus,
    ) -> Self {
        Self {
            id,
            principle,
            origin_cycle: cycle,
            source,
            confidence_bits: AtomicU64::new(confidence.clamp(0.0, 1.0).to_bits()),
            last_touched: AtomicU64::new(cycle),
            reinforcements: AtomicU64::new(0),
            lifecycle: Mutex::new(Lifecycle {
                status,
                conflicts: Vec::new(),
                superseded_by: None,
            }),
        }
    }

    pub fn from_snapshot(h: &Heuristic) -> Self {
        let cell = Self::new(
            h.id.clone(),
            h.principle.clone(),
            h.confidence,
            h.origin_cycle,
            h.source.clone(),
            h.status,
        );
        cell.last_touched.store(h.last_touched_cycle, Ordering::SeqCst);
        cell.reinforcements.store(h.reinforcements, Ordering::SeqCst);
        if let Ok(mut life) = cell.lifecycle.lock() {
            life.conflicts = h.conflicts.clone();
            life.superseded_by = h.superseded_by.clone();
        }
        cell
    }

    pub fn confidence(&self) -> f64 {
        f64::from_bits(self.confidence_bits.load(Ordering::SeqCst))
    }

    pub fn last_touched(&self) -> Cycle {
        self.last_touched.load(Ordering::SeqCst)
    }

    /// Atomically apply `f` to the confidence; returns `(before, after)`.
    fn update_confidence<F: Fn(f64) -> f64>(&self, f: F) -> (f64, f64) {
        let mut before = 0.0;
        let mut after = 0.0;
        // The closure always returns Some, so fetch_update cannot fail.
        let _ = self
            .confidence_bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                before = f64::from_bits(bits);
                after = f(before).clamp(0.0, 1.0);
                Some(after.to_bits())
            });
        (before, after)
    }

    pub fn reinforce(&self, step: f64, cycle: Cycle) -> (f64, f64) {
        let change = self.update_confidence(|c| c + step);
        self.touch(cycle);
        self.reinforcements.fetch_add(1, Ordering::SeqCst);
        change
    }

    pub fn decay(&self, amount: f64) -> (f64, f64) {
        self.update_confidence(|c| c - amount)
    }

    pub fn touch(&self, cycle: Cycle) {
        self.last_touched.fetch_max(cycle, Ordering::SeqCst);
    }

    pub fn lock(&self) -> HeuristicResult<MutexGuard<'_, Lifecycle>> {
        self.lifecycle.lock().map_err(|_| HeuristicError::LockPoisoned)
    }

    pub fn status(&self) -> HeuristicResult<HeuristicStatus> {
        Ok(self.lock()?.status)
    }

    pub fn snapshot(&self) -> HeuristicResult<Heuristic> {
        let life = self.lock()?;
        Ok(Heuristic {
            id: self.id.clone(),
            principle: self.principle.clone(),
            confidence: self.confidence(),
            origin_cycle: self.origin_cycle,
            status: life.status,
            conflicts: life.conflicts.clone(),
            last_touched_cycle: self.last_touched(),
            reinforcements: self.reinforcements.load(Ordering::SeqCst),
            superseded_by: life.superseded_by.clone(),
            source: self.source.clone(),
        })
    }
}

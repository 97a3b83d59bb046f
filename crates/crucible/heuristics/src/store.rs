use crate::cell::HeuristicCell;
use crate::config::HeuristicConfig;
use crate::error::{HeuristicError, HeuristicResult};
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt};
use crucible_types::text;
use crucible_types::{Cycle, Heuristic, HeuristicId, HeuristicSource, HeuristicStatus, OpKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Result of SYNTHESIZE.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    /// This call created the child.
    Created { child: HeuristicId },
    /// A concurrent or earlier call already replaced the pair; nothing written.
    AlreadySynthesized { child: Option<HeuristicId> },
    /// `parent` was at or above the synthesis floor when the locks were
    /// held; both heuristics stay live and nothing is written.
    AboveFloor { parent: HeuristicId },
}

impl SynthesisOutcome {
    pub fn child(&self) -> Option<&HeuristicId> {
        match self {
            Self::Created { child } => Some(child),
            Self::AlreadySynthesized { child } => child.as_ref(),
            Self::AboveFloor { .. } => None,
        }
    }
}

/// Result of one DECAY pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecayReport {
    pub cycle: Cycle,
    /// `(id, before, after)` for every heuristic that lost confidence.
    pub decayed: Vec<(HeuristicId, f64, f64)>,
    pub synthesized: Vec<SynthesisOutcome>,
}

#[derive(Default)]
struct Arena {
    cells: Vec<Arc<HeuristicCell>>,
    index: HashMap<HeuristicId, usize>,
}

/// Heuristic Store (HPL).
///
/// An arena of heuristics keyed by id. Components receive an explicit
/// `Arc<HeuristicStore>` handle; there is no ambient global store.
pub struct HeuristicStore {
    arena: RwLock<Arena>,
    ledger: Arc<Ledger>,
    config: HeuristicConfig,
}

impl HeuristicStore {
    /// Empty store that persists through `ledger`'s backend.
    pub fn new(ledger: Arc<Ledger>, config: HeuristicConfig) -> Self {
        Self {
            arena: RwLock::new(Arena::default()),
            ledger,
            config,
        }
    }

    /// Load every persisted heuristic.
    pub async fn open(ledger: Arc<Ledger>, config: HeuristicConfig) -> HeuristicResult<Self> {
        let stored: Vec<Heuristic> = ledger.store().list_json(Collection::Heuristics).await?;
        let store = Self::new(ledger, config);
        {
            let mut arena = store.arena_mut()?;
            for h in &stored {
                let idx = arena.cells.len();
                arena.index.insert(h.id.clone(), idx);
                arena.cells.push(Arc::new(HeuristicCell::from_snapshot(h)));
            }
        }
        debug!(count = stored.len(), "heuristic store loaded");
        Ok(store)
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    fn arena(&self) -> HeuristicResult<std::sync::RwLockReadGuard<'_, Arena>> {
        self.arena.read().map_err(|_| HeuristicError::LockPoisoned)
    }

    fn arena_mut(&self) -> HeuristicResult<std::sync::RwLockWriteGuard<'_, Arena>> {
        self.arena.write().map_err(|_| HeuristicError::LockPoisoned)
    }

    fn cell(&self, id: &HeuristicId) -> HeuristicResult<Arc<HeuristicCell>> {
        let arena = self.arena()?;
        arena
            .index
            .get(id)
            .map(|idx| arena.cells[*idx].clone())
            .ok_or_else(|| HeuristicError::Unknown(id.clone()))
    }

    fn cells(&self) -> HeuristicResult<Vec<Arc<HeuristicCell>>> {
        Ok(self.arena()?.cells.clone())
    }

    async fn persist(&self, cell: &HeuristicCell) -> HeuristicResult<()> {
        let snapshot = cell.snapshot()?;
        self.ledger
            .store()
            .put_json(Collection::Heuristics, snapshot.id.as_str(), &snapshot)
            .await?;
        Ok(())
    }

    /// Write every heuristic's current state to the backend.
    pub async fn flush(&self) -> HeuristicResult<()> {
        for cell in self.cells()? {
            self.persist(&cell).await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.arena().map(|a| a.cells.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &HeuristicId) -> HeuristicResult<Heuristic> {
        self.cell(id)?.snapshot()
    }

    /// Every heuristic, deprecated ones included, in insertion order.
    pub fn all(&self) -> HeuristicResult<Vec<Heuristic>> {
        self.cells()?.iter().map(|c| c.snapshot()).collect()
    }

    /// READ: the `top_k` live heuristics ranked by `confidence * recency`.
    pub fn read(&self, top_k: usize, current_cycle: Cycle) -> HeuristicResult<Vec<Heuristic>> {
        let mut live: Vec<Heuristic> = self
            .all()?
            .into_iter()
            .filter(|h| h.status.is_live())
            .collect();
        live.sort_by(|a, b| {
            b.score(current_cycle)
                .total_cmp(&a.score(current_cycle))
                .then_with(|| a.id.cmp(&b.id))
        });
        live.truncate(top_k);
        Ok(live)
    }

    /// Mean confidence over live heuristics (0 when empty).
    pub fn mean_confidence(&self) -> HeuristicResult<f64> {
        let live: Vec<f64> = self
            .all()?
            .into_iter()
            .filter(|h| h.status.is_live())
            .map(|h| h.confidence)
            .collect();
        if live.is_empty() {
            return Ok(0.0);
        }
        Ok(live.iter().sum::<f64>() / live.len() as f64)
    }

    /// WRITE: add a heuristic and register conflicts against contradicting
    /// live principles.
    pub async fn write(
        &self,
        principle: impl Into<String>,
        cycle: Cycle,
        source: HeuristicSource,
    ) -> HeuristicResult<Heuristic> {
        let principle = principle.into();
        if principle.trim().is_empty() {
            return Err(HeuristicError::EmptyPrinciple);
        }
        let status = match source {
            HeuristicSource::Genesis { pass: 3 } => HeuristicStatus::Synthesized,
            _ => HeuristicStatus::Active,
        };
        let id = HeuristicId::generate();
        let cell = Arc::new(HeuristicCell::new(
            id.clone(),
            principle.clone(),
            self.config.initial_confidence,
            cycle,
            source.clone(),
            status,
        ));

        let mut touched = Vec::new();
        for other in self.cells()? {
            if !other.status()?.is_live()
                || !text::contradicts(&principle, &other.principle, self.config.conflict_threshold)
            {
                continue;
            }
            link(&cell, &other)?;
            touched.push(other);
        }

        {
            let mut arena = self.arena_mut()?;
            let idx = arena.cells.len();
            arena.index.insert(id.clone(), idx);
            arena.cells.push(cell.clone());
        }

        let snapshot = cell.snapshot()?;
        self.ledger
            .commit(
                OpKind::HeuristicWritten,
                &json!({
                    "heuristic_id": id,
                    "principle": principle,
                    "confidence": snapshot.confidence,
                    "cycle": cycle,
                    "source": source,
                    "conflicts": snapshot.conflicts,
                }),
            )
            .await?;
        self.persist(&cell).await?;
        for other in &touched {
            self.persist(other).await?;
        }
        info!(heuristic = %id, conflicts = touched.len(), "heuristic written");
        Ok(snapshot)
    }

    /// Register a conflict between two live heuristics by hand.
    pub async fn register_conflict(&self, a: &HeuristicId, b: &HeuristicId) -> HeuristicResult<()> {
        if a == b {
            return Err(HeuristicError::SelfSynthesis(a.clone()));
        }
        let ca = self.cell(a)?;
        let cb = self.cell(b)?;
        link(&ca, &cb)?;
        self.persist(&ca).await?;
        self.persist(&cb).await?;
        Ok(())
    }

    /// REINFORCE: raise confidence by δ (clamped to 1) and mark as touched.
    pub async fn reinforce(&self, id: &HeuristicId, cycle: Cycle) -> HeuristicResult<f64> {
        let cell = self.cell(id)?;
        let (before, after) = {
            // Holding the lifecycle lock orders this against SYNTHESIZE's floor check.
            let life = cell.lock()?;
            if !life.status.is_live() {
                return Err(HeuristicError::Deprecated(id.clone()));
            }
            cell.reinforce(self.config.reinforce_step, cycle)
        };
        self.ledger
            .commit(
                OpKind::HeuristicReinforced,
                &json!({ "heuristic_id": id, "cycle": cycle, "before": before, "after": after }),
            )
            .await?;
        self.persist(&cell).await?;
        debug!(heuristic = %id, before, after, "heuristic reinforced");
        Ok(after)
    }

    /// Mark heuristics as used this cycle without changing confidence.
    pub fn touch(&self, ids: &[HeuristicId], cycle: Cycle) -> HeuristicResult<()> {
        for id in ids {
            self.cell(id)?.touch(cycle);
        }
        Ok(())
    }

    /// DECAY: every live heuristic not touched in `current_cycle` loses
    /// `ε * idle_cycles`. Heuristics that fall below the synthesis floor while
    /// holding a live conflict are synthesized with their weakest partner.
    pub async fn decay(&self, current_cycle: Cycle, idle_cycles: u64) -> HeuristicResult<DecayReport> {
        let amount = self.config.decay_step * idle_cycles as f64;
        let mut report = DecayReport {
            cycle: current_cycle,
            ..DecayReport::default()
        };
        let cells = self.cells()?;
        for cell in &cells {
            if !cell.status()?.is_live() || cell.last_touched() >= current_cycle {
                continue;
            }
            let (before, after) = cell.decay(amount);
            if after < before {
                report.decayed.push((cell.id.clone(), before, after));
            }
        }

        if !report.decayed.is_empty() {
            self.ledger
                .commit(
                    OpKind::HeuristicDecayed,
                    &json!({
                        "cycle": current_cycle,
                        "idle_cycles": idle_cycles,
                        "decayed": report.decayed,
                    }),
                )
                .await?;
        }
        for cell in &cells {
            self.persist(cell).await?;
        }

        for cell in &cells {
            if cell.confidence() >= self.config.synthesis_floor || !cell.status()?.is_live() {
                continue;
            }
            let Some(partner) = self.weakest_live_conflict(cell)? else {
                continue;
            };
            match self.synthesize(&cell.id, &partner, current_cycle).await? {
                SynthesisOutcome::AboveFloor { .. } => {}
                outcome => report.synthesized.push(outcome),
            }
        }
        Ok(report)
    }

    /// Weakest live partner of `cell` that is itself below the synthesis floor.
    fn weakest_live_conflict(&self, cell: &HeuristicCell) -> HeuristicResult<Option<HeuristicId>> {
        let conflicts = cell.lock()?.conflicts.clone();
        let mut best: Option<(f64, HeuristicId)> = None;
        for id in conflicts {
            let other = self.cell(&id)?;
            let c = other.confidence();
            if c >= self.config.synthesis_floor || !other.status()?.is_live() {
                continue;
            }
            if best.as_ref().map_or(true, |(bc, _)| c < *bc) {
                best = Some((c, id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    /// SYNTHESIZE: replace two conflicting heuristics that are both below the
    /// synthesis floor with one new ACTIVE child and deprecate both parents.
    /// A pair already replaced yields [`SynthesisOutcome::AlreadySynthesized`]
    /// and a parent at or above the floor yields
    /// [`SynthesisOutcome::AboveFloor`]; neither writes anything.
    pub async fn synthesize(
        &self,
        a: &HeuristicId,
        b: &HeuristicId,
        cycle: Cycle,
    ) -> HeuristicResult<SynthesisOutcome> {
        if a == b {
            return Err(HeuristicError::SelfSynthesis(a.clone()));
        }
        let ca = self.cell(a)?;
        let cb = self.cell(b)?;
        let (first, second) = if a < b { (&ca, &cb) } else { (&cb, &ca) };

        let child_cell = {
            let mut first_life = first.lock()?;
            let mut second_life = second.lock()?;

            if !first_life.status.is_live() || !second_life.status.is_live() {
                let child = first_life
                    .superseded_by
                    .clone()
                    .or_else(|| second_life.superseded_by.clone());
                debug!(a = %a, b = %b, "synthesis already applied; discarding");
                return Ok(SynthesisOutcome::AlreadySynthesized { child });
            }
            let registered = first_life.conflicts.contains(&second.id)
                || second_life.conflicts.contains(&first.id);
            if !registered {
                return Err(HeuristicError::NotConflicting(a.clone(), b.clone()));
            }
            // Confidence is read under both locks; REINFORCE takes the same lock.
            let (conf_a, conf_b) = (ca.confidence(), cb.confidence());
            let floor = self.config.synthesis_floor;
            if conf_a >= floor || conf_b >= floor {
                let parent = if conf_a >= floor { a.clone() } else { b.clone() };
                debug!(a = %a, b = %b, conf_a, conf_b, floor, "parent above synthesis floor; skipping");
                return Ok(SynthesisOutcome::AboveFloor { parent });
            }

            let (strong, weak) = if conf_a >= conf_b {
                (&ca, &cb)
            } else {
                (&cb, &ca)
            };
            let principle = format!(
                "reconcile: {} / except where: {}",
                strong.principle, weak.principle
            );
            let child_id = HeuristicId::generate();
            let child = Arc::new(HeuristicCell::new(
                child_id.clone(),
                principle,
                self.config.initial_confidence,
                cycle,
                HeuristicSource::Synthesis {
                    parent_a: a.clone(),
                    parent_b: b.clone(),
                },
                HeuristicStatus::Active,
            ));

            first_life.status = HeuristicStatus::Deprecated;
            first_life.superseded_by = Some(child_id.clone());
            second_life.status = HeuristicStatus::Deprecated;
            second_life.superseded_by = Some(child_id);
            child
        };

        {
            let mut arena = self.arena_mut()?;
            let idx = arena.cells.len();
            arena.index.insert(child_cell.id.clone(), idx);
            arena.cells.push(child_cell.clone());
        }

        self.ledger
            .commit(
                OpKind::HeuristicSynthesized,
                &json!({
                    "child": child_cell.id,
                    "parent_a": a,
                    "parent_b": b,
                    "cycle": cycle,
                    "principle": child_cell.principle,
                }),
            )
            .await?;
        self.persist(&child_cell).await?;
        self.persist(&ca).await?;
        self.persist(&cb).await?;
        info!(child = %child_cell.id, parent_a = %a, parent_b = %b, "heuristics synthesized");
        Ok(SynthesisOutcome::Created {
            child: child_cell.id.clone(),
        })
    }
}

/// Record a symmetric conflict. Locks are taken in id order.
fn link(a: &HeuristicCell, b: &HeuristicCell) -> HeuristicResult<()> {
    let (first, second) = if a.id < b.id { (a, b) } else { (b, a) };
    let mut first_life = first.lock()?;
    let mut second_life = second.lock()?;
    if !first_life.conflicts.contains(&second.id) {
        first_life.conflicts.push(second.id.clone());
    }
    if !second_life.conflicts.contains(&first.id) {
        second_life.conflicts.push(first.id.clone());
    }
    Ok(())
}

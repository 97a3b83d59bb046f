use crate::config::ScaffoldConfig;
use crate::error::{ScaffoldError, ScaffoldResult};
use chrono::Utc;
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt};
use crucible_types::text;
use crucible_types::{
    Catalyst, CatalystId, CatalystOrigin, Cycle, OpKind, Scaffold, ScaffoldId, ScaffoldState,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub scaffold_id: ScaffoldId,
    pub from: ScaffoldState,
    pub to: ScaffoldState,
}

/// What one manager pass changed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PassReport {
    pub cycle: Cycle,
    pub transitions: Vec<Transition>,
    /// One per contradictory pair; feed these to the next scan.
    pub catalysts: Vec<Catalyst>,
}

/// Scaffold Manager.
///
/// A pass runs once per completed cycle, in this order:
/// 1. DISSOLVE scaffolds from earlier passes archive; SOLIDIFY scaffolds
///    whose contradiction catalyst was consumed archive.
/// 2. ACTIVE scaffolds are checked pairwise (in id order); each contradictory
///    pair solidifies and raises exactly one catalyst. A scaffold joins at
///    most one pair per pass.
/// 3. Remaining ACTIVE scaffolds lose one TTL cycle and dissolve at zero.
pub struct ScaffoldManager {
    scaffolds: RwLock<Vec<Scaffold>>,
    ledger: Arc<Ledger>,
    config: ScaffoldConfig,
}

impl ScaffoldManager {
    pub fn new(ledger: Arc<Ledger>, config: ScaffoldConfig) -> Self {
        Self {
            scaffolds: RwLock::new(Vec::new()),
            ledger,
            config,
        }
    }

    pub async fn open(ledger: Arc<Ledger>, config: ScaffoldConfig) -> ScaffoldResult<Self> {
        let scaffolds: Vec<Scaffold> = ledger.store().list_json(Collection::Scaffolds).await?;
        Ok(Self {
            scaffolds: RwLock::new(scaffolds),
            ledger,
            config,
        })
    }

    pub fn config(&self) -> &ScaffoldConfig {
        &self.config
    }

    fn read(&self) -> ScaffoldResult<std::sync::RwLockReadGuard<'_, Vec<Scaffold>>> {
        self.scaffolds.read().map_err(|_| ScaffoldError::LockPoisoned)
    }

    fn write(&self) -> ScaffoldResult<std::sync::RwLockWriteGuard<'_, Vec<Scaffold>>> {
        self.scaffolds.write().map_err(|_| ScaffoldError::LockPoisoned)
    }

    pub fn all(&self) -> ScaffoldResult<Vec<Scaffold>> {
        Ok(self.read()?.clone())
    }

    pub fn get(&self, id: &ScaffoldId) -> ScaffoldResult<Scaffold> {
        self.read()?
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| ScaffoldError::Unknown(id.clone()))
    }

    pub async fn declare(
        &self,
        constraint_text: impl Into<String>,
        ttl_cycles: Option<u64>,
        cycle: Cycle,
    ) -> ScaffoldResult<Scaffold> {
        let text = constraint_text.into();
        if text.trim().is_empty() {
            return Err(ScaffoldError::EmptyConstraint);
        }
        let ttl = ttl_cycles.unwrap_or(self.config.default_ttl_cycles);
        let scaffold = Scaffold::new(text, ttl, cycle);
        self.ledger
            .commit(
                OpKind::ScaffoldDeclared,
                &json!({
                    "scaffold_id": scaffold.id,
                    "constraint_text": scaffold.constraint_text,
                    "ttl_cycles": ttl,
                    "cycle": cycle,
                }),
            )
            .await?;
        self.write()?.push(scaffold.clone());
        self.persist(&scaffold).await?;
        debug!(scaffold = %scaffold.id, ttl, "scaffold declared");
        Ok(scaffold)
    }

    async fn persist(&self, scaffold: &Scaffold) -> ScaffoldResult<()> {
        self.ledger
            .store()
            .put_json(Collection::Scaffolds, scaffold.id.as_str(), scaffold)
            .await?;
        Ok(())
    }

    /// Run one lifecycle pass. `consumed` lists catalysts already handled by
    /// a completed cycle.
    pub async fn pass(&self, cycle: Cycle, consumed: &[CatalystId]) -> ScaffoldResult<PassReport> {
        let mut report = PassReport {
            cycle,
            ..PassReport::default()
        };

        let changed: Vec<Scaffold> = {
            let mut scaffolds = self.write()?;
            let mut changed_ids = HashSet::new();

            for s in scaffolds.iter_mut() {
                let archive = match s.state {
                    ScaffoldState::Dissolve => true,
                    ScaffoldState::Solidify => s
                        .contradiction_catalyst
                        .as_ref()
                        .map_or(false, |c| consumed.contains(c)),
                    _ => false,
                };
                if archive {
                    apply(s, ScaffoldState::Archive, cycle, &mut report);
                    changed_ids.insert(s.id.clone());
                }
            }

            let mut active: Vec<usize> = scaffolds
                .iter()
                .enumerate()
                .filter(|(_, s)| s.state == ScaffoldState::Active)
                .map(|(i, _)| i)
                .collect();
            active.sort_by(|a, b| scaffolds[*a].id.cmp(&scaffolds[*b].id));

            let mut paired = HashSet::new();
            for (pos, &i) in active.iter().enumerate() {
                if paired.contains(&i) {
                    continue;
                }
                for &j in &active[pos + 1..] {
                    if paired.contains(&j) {
                        continue;
                    }
                    let (a, b) = (&scaffolds[i], &scaffolds[j]);
                    if !text::contradicts(
                        &a.constraint_text,
                        &b.constraint_text,
                        self.config.conflict_threshold,
                    ) {
                        continue;
                    }
                    let catalyst = contradiction_catalyst(a, b, self.config.contradiction_severity);
                    info!(
                        scaffold_a = %a.id,
                        scaffold_b = %b.id,
                        catalyst = %catalyst.id,
                        "scaffold contradiction"
                    );
                    for (me, other) in [(i, j), (j, i)] {
                        let other_id = scaffolds[other].id.clone();
                        let s = &mut scaffolds[me];
                        s.conflicts_with.push(other_id);
                        s.contradiction_catalyst = Some(catalyst.id.clone());
                        apply(s, ScaffoldState::Solidify, cycle, &mut report);
                        changed_ids.insert(s.id.clone());
                    }
                    report.catalysts.push(catalyst);
                    paired.insert(i);
                    paired.insert(j);
                    break;
                }
            }

            for &i in &active {
                if paired.contains(&i) {
                    continue;
                }
                let s = &mut scaffolds[i];
                s.ttl_cycles = s.ttl_cycles.saturating_sub(1);
                if s.ttl_cycles == 0 {
                    apply(s, ScaffoldState::Dissolve, cycle, &mut report);
                }
                changed_ids.insert(s.id.clone());
            }

            scaffolds
                .iter()
                .filter(|s| changed_ids.contains(&s.id))
                .cloned()
                .collect()
        };

        if !report.transitions.is_empty() {
            self.ledger
                .commit(
                    OpKind::ScaffoldTransition,
                    &json!({
                        "cycle": cycle,
                        "transitions": report.transitions,
                        "catalysts": report.catalysts.iter().map(|c| &c.id).collect::<Vec<_>>(),
                    }),
                )
                .await?;
        }
        for s in &changed {
            self.persist(s).await?;
        }
        Ok(report)
    }

    /// Share of scaffolds that ended without contradiction.
    pub fn stability(&self) -> ScaffoldResult<f64> {
        let scaffolds = self.read()?;
        Ok(stability_ratio(&scaffolds))
    }
}

/// `1 - solidified / total`, where a scaffold counts as solidified if it ever
/// entered SOLIDIFY. An empty set is fully stable.
pub fn stability_ratio(scaffolds: &[Scaffold]) -> f64 {
    if scaffolds.is_empty() {
        return 1.0;
    }
    let solidified = scaffolds
        .iter()
        .filter(|s| s.history.iter().any(|(_, st)| *st == ScaffoldState::Solidify))
        .count();
    1.0 - solidified as f64 / scaffolds.len() as f64
}

fn apply(s: &mut Scaffold, next: ScaffoldState, cycle: Cycle, report: &mut PassReport) {
    let from = s.state;
    if s.transition(next, cycle) {
        report.transitions.push(Transition {
            scaffold_id: s.id.clone(),
            from,
            to: next,
        });
    }
}

fn contradiction_catalyst(a: &Scaffold, b: &Scaffold, severity: f64) -> Catalyst {
    Catalyst::new(
        severity,
        format!(
            "scaffold {} (\"{}\") contradicts scaffold {} (\"{}\")",
            a.id, a.constraint_text, b.id, b.constraint_text
        ),
        "scaffold",
        Utc::now(),
        CatalystOrigin::ScaffoldContradiction {
            scaffold_a: a.id.clone(),
            scaffold_b: b.id.clone(),
        },
    )
}

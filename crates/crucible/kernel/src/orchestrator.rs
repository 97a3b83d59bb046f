//! Cycle Orchestrator: `SCAN -> ARCHITECT -> EXECUTE -> INTEGRATE -> (SCAN | HALTED)`.
//!
//! Each state is its own step so the CLI can advance one state per
//! process; [`Orchestrator::run_cycle`] drives a whole cycle. Steps read
//! and write the stream's [`Cursor`] so any step can resume where the last
//! one left off. An abort request is honoured between states, never
//! inside one.

use crate::cursor::{self, CatalystRecord, Cursor, CycleState};
use crate::error::{KernelError, KernelResult};
use crate::runtime::Crucible;
use crucible_foundry::CompileRequest;
use crucible_genesis::{GenesisReport, GenesisTrigger};
use crucible_heuristics::HeuristicError;
use crucible_ledger::events::CatalystSelected;
use crucible_ledger::{ChainReport, Lineage};
use crucible_metrics::{EvidencePack, StopRuleEvaluation};
use crucible_scaffold::Transition;
use crucible_store::{Collection, RecordStoreExt};
use crucible_synthesizer::Problem;
use crucible_types::{
    ArtifactId, ArtifactKind, Catalyst, CatalystId, ContentHash, Cycle, Decision, DecisionId,
    ErrorClass, HeuristicId, HeuristicSource, MetricsSnapshot, OpKind, Plan, PlanId, RoleOutput,
    Scaffold, StreamId, Vow, VowId,
};
use crucible_vows::VowStatus;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub stream: StreamId,
    pub cycle: Cycle,
    pub catalyst: Catalyst,
    pub considered: usize,
    pub skipped: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchitectOutcome {
    pub stream: StreamId,
    pub cycle: Cycle,
    pub plan_id: PlanId,
    pub decision_id: DecisionId,
    pub accepted: bool,
    pub confidence: f64,
    pub novelty: f64,
    pub retries_consumed: u32,
    pub confidences: Vec<f64>,
    pub genesis: Option<GenesisReport>,
    /// Heuristics reinforced by an accepted decision, with their new
    /// confidence.
    pub reinforced: Vec<(HeuristicId, f64)>,
    /// Heuristic learned from an accepted decision that used none.
    pub learned: Option<HeuristicId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub digest: ContentHash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteOutcome {
    pub stream: StreamId,
    pub cycle: Cycle,
    pub artifacts: Vec<ArtifactSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrateOutcome {
    pub stream: StreamId,
    pub cycle: Cycle,
    pub decayed: usize,
    pub synthesized: usize,
    pub transitions: Vec<Transition>,
    /// Internal catalysts raised by scaffold contradictions.
    pub raised: Vec<CatalystId>,
    pub adherence: BTreeMap<VowId, bool>,
    pub snapshot: MetricsSnapshot,
    pub evaluation: StopRuleEvaluation,
    pub evidence: Option<EvidencePack>,
}

/// Everything one full cycle did.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleReport {
    pub stream: StreamId,
    pub cycle: Cycle,
    pub scan: Option<ScanOutcome>,
    pub architect: Option<ArchitectOutcome>,
    pub execute: Option<ExecuteOutcome>,
    /// Set when the foundry refused to publish.
    pub validation_failure: Option<String>,
    pub integrate: IntegrateOutcome,
}

impl CycleReport {
    pub fn halted(&self) -> bool {
        self.integrate.evidence.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(Box<CycleReport>),
    /// The stream was already halted; this is its evidence pack.
    Halted(Box<EvidencePack>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsReport {
    pub stream: StreamId,
    pub cycle: Cycle,
    /// Computed now, not recorded.
    pub current: MetricsSnapshot,
    pub history: Vec<MetricsSnapshot>,
    pub plateau: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditClearance {
    pub stream: StreamId,
    pub chain: ChainReport,
    pub note: String,
}

fn evidence_key(stream: &StreamId) -> String {
    format!("evidence:{stream}")
}

/// One catalyst stream.
pub struct Orchestrator {
    crucible: Arc<Crucible>,
    stream: StreamId,
    abort: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(crucible: Arc<Crucible>, stream: StreamId) -> Self {
        Self {
            crucible,
            stream,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    pub fn crucible(&self) -> &Arc<Crucible> {
        &self.crucible
    }

    /// Handle that aborts the in-flight cycle at the next state boundary.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub async fn cursor(&self) -> KernelResult<Cursor> {
        Cursor::load(&self.crucible.ledger, &self.stream).await
    }

    /// Evidence pack of a halted stream.
    pub async fn evidence(&self) -> KernelResult<Option<EvidencePack>> {
        Ok(self
            .crucible
            .ledger
            .store()
            .get_json(Collection::KernelState, &evidence_key(&self.stream))
            .await?)
    }

    /// Load the cursor and check it may run `expected`.
    async fn enter(&self, expected: CycleState) -> KernelResult<Cursor> {
        let mut cursor = self.cursor().await?;
        if cursor.is_halted() {
            if cursor.audit_required {
                return Err(KernelError::AuditRequired(self.stream.clone()));
            }
            return Err(KernelError::Halted {
                stream: self.stream.clone(),
                digest: cursor.evidence_digest.clone().unwrap_or_else(ContentHash::zero),
            });
        }
        if cursor.state != expected {
            return Err(KernelError::WrongState {
                stream: self.stream.clone(),
                expected,
                found: cursor.state,
            });
        }
        if self.abort.swap(false, Ordering::SeqCst) {
            let reason = "abort requested".to_string();
            self.abort_cycle(&mut cursor, &reason).await?;
            return Err(KernelError::Aborted {
                cycle: cursor.cycle,
                reason,
            });
        }
        Ok(cursor)
    }

    /// Record why the cycle stopped, then drop its in-flight state.
    async fn abort_cycle(&self, cursor: &mut Cursor, reason: &str) -> KernelResult<()> {
        self.crucible
            .ledger
            .commit(
                OpKind::CycleAborted,
                &json!({
                    "stream": self.stream,
                    "cycle": cursor.cycle,
                    "state": cursor.state,
                    "catalyst_id": cursor.catalyst.as_ref().map(|c| &c.id),
                    "reason": reason,
                }),
            )
            .await?;
        warn!(stream = %self.stream, cycle = cursor.cycle, state = %cursor.state, reason, "cycle aborted");
        cursor.reset();
        cursor.save(&self.crucible.ledger).await
    }

    async fn halt_for_audit(&self, cursor: &mut Cursor, cause: &KernelError) -> KernelResult<()> {
        error!(stream = %self.stream, error = %cause, "integrity failure; halting for external audit");
        cursor.state = CycleState::Halted;
        cursor.audit_required = true;
        cursor.save(&self.crucible.ledger).await?;
        self.crucible
            .ledger
            .commit(
                OpKind::Halted,
                &json!({
                    "stream": self.stream,
                    "cycle": cursor.cycle,
                    "audit_required": true,
                    "reason": cause.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    /// SCAN: verify the chain, then select one catalyst.
    pub async fn scan(&self) -> KernelResult<ScanOutcome> {
        let mut cursor = self.enter(CycleState::Scan).await?;
        let ledger = &self.crucible.ledger;

        if let Err(e) = ledger.verify_chain().await {
            let e = KernelError::from(e);
            if e.class() == ErrorClass::IntegrityError {
                self.halt_for_audit(&mut cursor, &e).await?;
            }
            return Err(e);
        }

        let cycle = cursor.cycle + 1;
        let claim = self.crucible.queue.lock().await;
        let pending = cursor::pending(ledger).await?;
        let selection = match self.crucible.scanner.scan(&pending).await {
            Ok(selection) => selection,
            Err(e) => {
                let e = KernelError::from(e);
                ledger
                    .commit(
                        OpKind::CycleAborted,
                        &json!({
                            "stream": self.stream,
                            "cycle": cycle,
                            "state": CycleState::Scan,
                            "class": e.class(),
                            "reason": e.to_string(),
                        }),
                    )
                    .await?;
                warn!(stream = %self.stream, cycle, error = %e, "scan found nothing");
                return Err(e);
            }
        };

        let catalyst = selection.catalyst;
        if catalyst.is_internal() {
            if !cursor::mark_consumed(ledger, &catalyst.id, &self.stream, cycle).await? {
                warn!(catalyst = %catalyst.id, "internal catalyst was already consumed");
            }
        } else {
            ledger
                .store()
                .put_json(
                    Collection::Catalysts,
                    catalyst.id.as_str(),
                    &CatalystRecord::consumed(catalyst.clone(), self.stream.clone(), cycle),
                )
                .await?;
        }
        drop(claim);

        ledger
            .commit(
                OpKind::CatalystSelected,
                &CatalystSelected {
                    catalyst_id: catalyst.id.clone(),
                    stream: self.stream.clone(),
                    cycle,
                    severity: catalyst.severity,
                    domain_tag: catalyst.domain_tag.clone(),
                    internal: catalyst.is_internal(),
                },
            )
            .await?;

        cursor.cycle = cycle;
        cursor.catalyst = Some(catalyst.clone());
        cursor.state = CycleState::Architect;
        cursor.save(ledger).await?;

        info!(
            stream = %self.stream,
            cycle,
            catalyst = %catalyst.id,
            severity = catalyst.severity,
            domain = %catalyst.domain_tag,
            internal = catalyst.is_internal(),
            "catalyst selected"
        );
        Ok(ScanOutcome {
            stream: self.stream.clone(),
            cycle,
            catalyst,
            considered: selection.considered,
            skipped: selection.skipped,
        })
    }

    fn problem(&self, cursor: &Cursor) -> KernelResult<Problem> {
        let catalyst = cursor.catalyst.as_ref().ok_or_else(|| KernelError::Missing {
            stream: self.stream.clone(),
            what: "catalyst",
        })?;
        Ok(Problem::from_catalyst(catalyst, self.stream.clone(), cursor.cycle))
    }

    /// Genesis on bootstrap (empty store) or on plateau, at most once per
    /// trend window.
    async fn maybe_genesis(
        &self,
        cursor: &mut Cursor,
        problem: &Problem,
    ) -> KernelResult<Option<GenesisReport>> {
        let c = &self.crucible;
        let cycle = cursor.cycle;
        let window = c.config.stop_rule.trend_window;
        let trigger = if c.config.cycle.bootstrap_genesis && c.heuristics.is_empty() {
            Some(GenesisTrigger::Bootstrap)
        } else if cursor.last_genesis_cycle.map_or(true, |g| cycle >= g + window)
            && c.metrics.plateau(cycle).await?
        {
            Some(GenesisTrigger::Plateau)
        } else {
            None
        };
        let Some(trigger) = trigger else {
            return Ok(None);
        };

        cursor.last_genesis_cycle = Some(cycle);
        cursor.save(&c.ledger).await?;
        match c.genesis.run(problem, trigger).await {
            Ok(report) => Ok(Some(report)),
            Err(e) if !e.class().is_fatal() => {
                warn!(stream = %self.stream, cycle, ?trigger, error = %e, "genesis did not complete");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// ARCHITECT: deliberate on the catalyst and record a decision.
    ///
    /// A novelty violation leaves the stream in ARCHITECT for another try
    /// until the retry bound is spent, then aborts the cycle.
    pub async fn architect(&self) -> KernelResult<ArchitectOutcome> {
        let mut cursor = self.enter(CycleState::Architect).await?;
        let problem = self.problem(&cursor)?;
        let genesis = self.maybe_genesis(&mut cursor, &problem).await?;
        let c = &self.crucible;

        let synthesis = match c.synthesizer.decide(&problem).await {
            Ok(synthesis) => synthesis,
            Err(e) => {
                let e = KernelError::from(e);
                match e.class() {
                    ErrorClass::NoveltyViolation => {
                        cursor.novelty_retries += 1;
                        if cursor.novelty_retries > c.config.cycle.max_novelty_retries {
                            self.abort_cycle(&mut cursor, &e.to_string()).await?;
                        } else {
                            warn!(
                                stream = %self.stream,
                                cycle = cursor.cycle,
                                retry = cursor.novelty_retries,
                                "novelty violation; architect will retry"
                            );
                            cursor.save(&c.ledger).await?;
                        }
                    }
                    ErrorClass::ValidationError => {
                        self.abort_cycle(&mut cursor, &e.to_string()).await?;
                    }
                    _ => {}
                }
                return Err(e);
            }
        };

        let cycle = cursor.cycle;
        let mut reinforced = Vec::new();
        let mut learned = None;
        if synthesis.decision.accepted {
            if synthesis.used_heuristics.is_empty() {
                let principle = format!("[{}] {}", problem.domain_tag, synthesis.plan.thesis);
                let h = c
                    .heuristics
                    .write(principle, cycle, HeuristicSource::Decision)
                    .await?;
                learned = Some(h.id);
            } else {
                for id in &synthesis.used_heuristics {
                    match c.heuristics.reinforce(id, cycle).await {
                        Ok(confidence) => reinforced.push((id.clone(), confidence)),
                        Err(HeuristicError::Deprecated(_)) => {
                            debug!(heuristic = %id, "heuristic superseded before reinforcement")
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        let decision = &synthesis.decision;
        cursor.plan_id = Some(synthesis.plan.id.clone());
        cursor.decision_id = Some(decision.id.clone());
        cursor.accepted = decision.accepted;
        cursor.state = CycleState::Execute;
        cursor.save(&c.ledger).await?;

        info!(
            stream = %self.stream,
            cycle,
            decision = %decision.id,
            accepted = decision.accepted,
            confidence = decision.confidence,
            "architect complete"
        );
        Ok(ArchitectOutcome {
            stream: self.stream.clone(),
            cycle,
            plan_id: synthesis.plan.id.clone(),
            decision_id: decision.id.clone(),
            accepted: decision.accepted,
            confidence: decision.confidence,
            novelty: synthesis.plan.novelty(),
            retries_consumed: decision.retries_consumed,
            confidences: synthesis.confidences.clone(),
            genesis,
            reinforced,
            learned,
        })
    }

    /// EXECUTE: compile and publish the decision's artifacts.
    ///
    /// A validation failure publishes nothing, moves on to INTEGRATE (where
    /// the violated vows are logged) and is returned to the caller.
    pub async fn execute(&self, time_critical: bool) -> KernelResult<ExecuteOutcome> {
        let mut cursor = self.enter(CycleState::Execute).await?;
        let missing = |what| KernelError::Missing {
            stream: self.stream.clone(),
            what,
        };
        let plan_id = cursor.plan_id.clone().ok_or_else(|| missing("plan"))?;
        let decision_id = cursor.decision_id.clone().ok_or_else(|| missing("decision"))?;
        let domain_tag = cursor
            .catalyst
            .as_ref()
            .map(|c| c.domain_tag.clone())
            .ok_or_else(|| missing("catalyst"))?;

        let c = &self.crucible;
        let store = c.ledger.store();
        let plan: Plan = store.require_json(Collection::Plans, plan_id.as_str()).await?;
        let decision: Decision = store
            .require_json(Collection::Decisions, decision_id.as_str())
            .await?;

        let request = CompileRequest {
            decision: &decision,
            plan: &plan,
            domain_tag: &domain_tag,
            stream: &self.stream,
            time_critical,
        };
        match c.foundry.compile(&request).await {
            Ok(artifacts) => {
                cursor.artifact_ids = artifacts.iter().map(|a| a.id.clone()).collect();
                cursor.state = CycleState::Integrate;
                cursor.save(&c.ledger).await?;
                info!(stream = %self.stream, cycle = cursor.cycle, artifacts = artifacts.len(), "artifacts published");
                Ok(ExecuteOutcome {
                    stream: self.stream.clone(),
                    cycle: cursor.cycle,
                    artifacts: artifacts
                        .into_iter()
                        .map(|a| ArtifactSummary {
                            id: a.id,
                            kind: a.kind,
                            digest: a.digest,
                        })
                        .collect(),
                })
            }
            Err(e) => {
                if e.class() == ErrorClass::ValidationError {
                    cursor.violated_vows = e.violated_vows().to_vec();
                    cursor.state = CycleState::Integrate;
                    cursor.save(&c.ledger).await?;
                }
                Err(e.into())
            }
        }
    }

    /// INTEGRATE: decay, scaffold pass, vow adherence, metrics, Stop Rule.
    pub async fn integrate(&self) -> KernelResult<IntegrateOutcome> {
        let mut cursor = self.enter(CycleState::Integrate).await?;
        let c = &self.crucible;
        let cycle = cursor.cycle;

        let decay = c
            .heuristics
            .decay(cycle, c.config.cycle.decay_idle_cycles)
            .await?;

        let consumed: Vec<CatalystId> = cursor
            .catalyst
            .iter()
            .filter(|catalyst| catalyst.is_internal())
            .map(|catalyst| catalyst.id.clone())
            .collect();
        let pass = c.scaffolds.pass(cycle, &consumed).await?;
        for catalyst in &pass.catalysts {
            cursor::enqueue(&c.ledger, catalyst).await?;
        }

        let adherence = c.vows.log_adherence(cycle, &cursor.violated_vows).await?;
        c.heuristics.flush().await?;

        let snapshot = c
            .metrics
            .snapshot(cycle, &c.heuristics.all()?, &c.scaffolds.all()?)
            .await?;
        c.metrics.record(&snapshot).await?;
        let evaluation = c.metrics.evaluate(cycle).await?;

        c.ledger
            .commit(
                OpKind::CycleCompleted,
                &json!({
                    "stream": self.stream,
                    "cycle": cycle,
                    "catalyst_id": cursor.catalyst.as_ref().map(|c| &c.id),
                    "decision_id": cursor.decision_id,
                    "accepted": cursor.accepted,
                    "artifact_ids": cursor.artifact_ids,
                    "violated_vows": cursor.violated_vows,
                    "halt": evaluation.halt,
                }),
            )
            .await?;

        let evidence = if evaluation.halt {
            Some(self.halt(&mut cursor, evaluation.clone()).await?)
        } else {
            debug!(stream = %self.stream, cycle, unmet = ?evaluation.unmet(), "stop rule not met");
            cursor.reset();
            cursor.save(&c.ledger).await?;
            None
        };

        Ok(IntegrateOutcome {
            stream: self.stream.clone(),
            cycle,
            decayed: decay.decayed.len(),
            synthesized: decay.synthesized.len(),
            transitions: pass.transitions,
            raised: pass.catalysts.into_iter().map(|c| c.id).collect(),
            adherence,
            snapshot,
            evaluation,
            evidence,
        })
    }

    async fn halt(
        &self,
        cursor: &mut Cursor,
        evaluation: StopRuleEvaluation,
    ) -> KernelResult<EvidencePack> {
        let c = &self.crucible;
        let pack = c
            .metrics
            .evidence_pack(&self.stream, cursor.cycle, evaluation, c.foundry.key())
            .await?;
        c.ledger
            .store()
            .put_json(Collection::KernelState, &evidence_key(&self.stream), &pack)
            .await?;
        c.ledger
            .commit(
                OpKind::Halted,
                &json!({
                    "stream": self.stream,
                    "cycle": cursor.cycle,
                    "audit_required": false,
                    "evidence_digest": pack.digest,
                    "summary": pack.summary(),
                }),
            )
            .await?;
        cursor.state = CycleState::Halted;
        cursor.evidence_digest = Some(pack.digest.clone());
        cursor.save(&c.ledger).await?;
        info!(stream = %self.stream, cycle = cursor.cycle, digest = %pack.digest.short(), "stop rule met; stream halted");
        Ok(pack)
    }

    async fn halted_outcome(&self, cursor: &Cursor) -> KernelResult<CycleOutcome> {
        if cursor.audit_required {
            return Err(KernelError::AuditRequired(self.stream.clone()));
        }
        let pack = self.evidence().await?.ok_or_else(|| KernelError::Missing {
            stream: self.stream.clone(),
            what: "evidence pack",
        })?;
        debug!(stream = %self.stream, digest = %pack.digest.short(), "stream already halted");
        Ok(CycleOutcome::Halted(Box::new(pack)))
    }

    /// Drive the stream from wherever its cursor stands through INTEGRATE.
    ///
    /// A halted stream is left untouched and its evidence pack re-reported.
    pub async fn run_cycle(&self, time_critical: bool) -> KernelResult<CycleOutcome> {
        let cursor = self.cursor().await?;
        if cursor.is_halted() {
            return self.halted_outcome(&cursor).await;
        }

        let mut scan = None;
        let mut architect = None;
        let mut execute = None;
        let mut validation_failure = None;
        let mut state = cursor.state;
        loop {
            match state {
                CycleState::Scan => scan = Some(self.scan().await?),
                CycleState::Architect => match self.architect().await {
                    Ok(outcome) => architect = Some(outcome),
                    Err(e) => {
                        let retry = e.class() == ErrorClass::NoveltyViolation
                            && self.cursor().await?.state == CycleState::Architect;
                        if !retry {
                            return Err(e);
                        }
                    }
                },
                CycleState::Execute => match self.execute(time_critical).await {
                    Ok(outcome) => execute = Some(outcome),
                    Err(e) => {
                        let recorded = e.class() == ErrorClass::ValidationError
                            && self.cursor().await?.state == CycleState::Integrate;
                        if !recorded {
                            return Err(e);
                        }
                        validation_failure = Some(e.to_string());
                    }
                },
                CycleState::Integrate => {
                    let integrate = self.integrate().await?;
                    return Ok(CycleOutcome::Completed(Box::new(CycleReport {
                        stream: self.stream.clone(),
                        cycle: integrate.cycle,
                        scan,
                        architect,
                        execute,
                        validation_failure,
                        integrate,
                    })));
                }
                CycleState::Halted => {
                    let cursor = self.cursor().await?;
                    return self.halted_outcome(&cursor).await;
                }
            }
            state = self.cursor().await?.state;
        }
    }

    /// Clear an integrity halt. Succeeds only once the chain verifies again.
    pub async fn resume_after_audit(&self, note: &str) -> KernelResult<AuditClearance> {
        let mut cursor = self.cursor().await?;
        if !cursor.is_halted() {
            return Err(KernelError::WrongState {
                stream: self.stream.clone(),
                expected: CycleState::Halted,
                found: cursor.state,
            });
        }
        if !cursor.audit_required {
            return Err(KernelError::Halted {
                stream: self.stream.clone(),
                digest: cursor.evidence_digest.clone().unwrap_or_else(ContentHash::zero),
            });
        }

        let c = &self.crucible;
        let chain = c.ledger.verify_chain().await?;
        c.ledger
            .commit(
                OpKind::AuditCleared,
                &json!({
                    "stream": self.stream,
                    "cycle": cursor.cycle,
                    "note": note,
                    "entries": chain.entries,
                    "tip": chain.tip,
                }),
            )
            .await?;
        cursor.audit_required = false;
        cursor.evidence_digest = None;
        cursor.reset();
        cursor.save(&c.ledger).await?;
        info!(stream = %self.stream, entries = chain.entries, "audit cleared; stream resumed");
        Ok(AuditClearance {
            stream: self.stream.clone(),
            chain,
            note: note.to_string(),
        })
    }

    /// The question the provocateur would raise for the current catalyst,
    /// without claiming it.
    pub async fn ghost(&self) -> KernelResult<RoleOutput> {
        let cursor = self.cursor().await?;
        if cursor.state != CycleState::Architect {
            return Err(KernelError::WrongState {
                stream: self.stream.clone(),
                expected: CycleState::Architect,
                found: cursor.state,
            });
        }
        let problem = self.problem(&cursor)?;
        Ok(self.crucible.synthesizer.provoke(&problem)?)
    }

    /// Run genesis on the current catalyst on demand.
    pub async fn decompose(&self) -> KernelResult<GenesisReport> {
        let mut cursor = self.enter(CycleState::Architect).await?;
        let problem = self.problem(&cursor)?;
        let report = self
            .crucible
            .genesis
            .run(&problem, GenesisTrigger::Manual)
            .await?;
        cursor.last_genesis_cycle = Some(cursor.cycle);
        cursor.save(&self.crucible.ledger).await?;
        Ok(report)
    }

    pub async fn declare_vow(&self, text: &str, min_cycles: u64) -> KernelResult<Vow> {
        let cycle = self.cursor().await?.cycle;
        Ok(self.crucible.vows.declare_vow(text, min_cycles, cycle).await?)
    }

    pub async fn liberate_vow(&self, id: &VowId, justification: &str) -> KernelResult<Vow> {
        let cycle = self.cursor().await?.cycle;
        Ok(self
            .crucible
            .vows
            .request_liberation(id, justification, cycle)
            .await?)
    }

    pub async fn vow_status(&self) -> KernelResult<Vec<VowStatus>> {
        let cycle = self.cursor().await?.cycle;
        Ok(self.crucible.vows.status(cycle)?)
    }

    pub async fn declare_scaffold(&self, text: &str, ttl_cycles: Option<u64>) -> KernelResult<Scaffold> {
        let cycle = self.cursor().await?.cycle;
        Ok(self.crucible.scaffolds.declare(text, ttl_cycles, cycle).await?)
    }

    pub async fn metrics(&self) -> KernelResult<MetricsReport> {
        let cycle = self.cursor().await?.cycle;
        let c = &self.crucible;
        let current = c
            .metrics
            .snapshot(cycle, &c.heuristics.all()?, &c.scaffolds.all()?)
            .await?;
        Ok(MetricsReport {
            stream: self.stream.clone(),
            cycle,
            current,
            history: c.metrics.history().await?,
            plateau: c.metrics.plateau(cycle).await?,
        })
    }

    /// Evaluate the Stop Rule at the current cycle without acting on it.
    pub async fn stop_rule_check(&self) -> KernelResult<StopRuleEvaluation> {
        let cycle = self.cursor().await?.cycle;
        Ok(self.crucible.metrics.evaluate(cycle).await?)
    }

    pub async fn lineage(&self, artifact_id: &str) -> KernelResult<Lineage> {
        Ok(self.crucible.ledger.lineage(artifact_id).await?)
    }

    pub async fn verify_chain(&self) -> KernelResult<ChainReport> {
        Ok(self.crucible.ledger.verify_chain().await?)
    }
}

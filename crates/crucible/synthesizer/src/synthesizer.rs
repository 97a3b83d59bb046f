use crate::config::SynthesisConfig;
use crate::error::{SynthesisError, SynthesisResult};
use crate::merge;
use crate::novelty::QuestionHistory;
use crate::problem::Problem;
use crate::roles::{Evaluate, Evaluator, Falsifier, Innovator, Narrator, Provocateur, RoleInput};
use chrono::Utc;
use crucible_heuristics::HeuristicStore;
use crucible_ledger::events::{DecisionRecorded, PlanProposed};
use crucible_ledger::Ledger;
use crucible_store::{Collection, RecordStoreExt};
use crucible_types::text;
use crucible_types::{
    AgentOutputs, CatalystId, Cycle, Decision, Heuristic, HeuristicId, OpKind, Plan, PlanId,
    RoleOutput,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persisted provocateur question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvocationRecord {
    pub question: String,
    pub novelty: f64,
    pub plan_id: PlanId,
    pub catalyst_id: CatalystId,
    pub cycle: Cycle,
}

/// Outcome of the retry loop for one problem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deliberation {
    /// Last plan evaluated; it is the accepted one when its confidence
    /// cleared the threshold.
    pub plan: Plan,
    pub retries_consumed: u32,
    /// Confidence of every attempt in order.
    pub confidences: Vec<f64>,
    pub used_heuristics: Vec<HeuristicId>,
}

impl Deliberation {
    pub fn cleared(&self, threshold: f64) -> bool {
        self.plan.confidence >= threshold
    }
}

/// A plan turned into a decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Synthesis {
    pub plan: Plan,
    pub decision: Decision,
    pub confidences: Vec<f64>,
    pub used_heuristics: Vec<HeuristicId>,
}

/// Dialectical Synthesizer.
pub struct Synthesizer {
    innovator: Evaluator,
    falsifier: Evaluator,
    narrator: Evaluator,
    provocateur: Evaluator,
    preview: Provocateur,
    history: Arc<QuestionHistory>,
    ledger: Arc<Ledger>,
    heuristics: Arc<HeuristicStore>,
    config: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(
        ledger: Arc<Ledger>,
        heuristics: Arc<HeuristicStore>,
        history: Arc<QuestionHistory>,
        config: SynthesisConfig,
    ) -> Self {
        let conflict_threshold = heuristics.config().conflict_threshold;
        Self {
            innovator: Evaluator::Innovator(Innovator),
            falsifier: Evaluator::Falsifier(Falsifier),
            narrator: Evaluator::Narrator(Narrator::new(conflict_threshold)),
            provocateur: Evaluator::Provocateur(Provocateur::new(
                history.clone(),
                config.novelty_threshold,
                config.max_novelty_attempts,
            )),
            preview: Provocateur::new(
                history.clone(),
                config.novelty_threshold,
                config.max_novelty_attempts,
            ),
            history,
            ledger,
            heuristics,
            config,
        }
    }

    /// Load the question history from the store.
    pub async fn load_history(ledger: &Ledger) -> SynthesisResult<Arc<QuestionHistory>> {
        let records: Vec<ProvocationRecord> =
            ledger.store().list_json(Collection::Provocations).await?;
        Ok(Arc::new(QuestionHistory::new(
            records.into_iter().map(|r| r.question).collect(),
        )))
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<QuestionHistory> {
        &self.history
    }

    /// Live heuristics relevant to the problem, best first.
    pub fn relevant_heuristics(&self, problem: &Problem) -> SynthesisResult<Vec<Heuristic>> {
        let subject = text::token_set(&problem.subject());
        let ranked = self.heuristics.read(usize::MAX, problem.cycle)?;
        Ok(ranked
            .into_iter()
            .filter(|h| text::token_set(&h.principle).intersection(&subject).next().is_some())
            .take(self.config.top_k_heuristics)
            .collect())
    }

    /// The question the provocateur would ask next, without claiming it.
    pub fn provoke(&self, problem: &Problem) -> SynthesisResult<RoleOutput> {
        self.preview.preview(problem)
    }

    /// One evaluation and merge. Claims a provocateur question but writes
    /// nothing to the ledger.
    pub async fn evaluate(
        &self,
        problem: &Problem,
        attempt: u32,
        prior_findings: &[String],
        heuristics: &[Heuristic],
    ) -> SynthesisResult<Plan> {
        let base = RoleInput {
            problem,
            attempt,
            prior_findings,
            heuristics,
            thesis: None,
            antithesis: None,
        };
        let innovator = self.innovator.evaluate(&base)?;
        let with_thesis = RoleInput {
            thesis: Some(&innovator.text),
            ..base
        };

        let (falsifier, provocateur) = tokio::join!(
            async { self.falsifier.evaluate(&with_thesis) },
            async { self.provocateur.evaluate(&with_thesis) },
        );
        let falsifier = falsifier?;
        let provocateur = provocateur?;

        let antithesis = falsifier.dissents().then(|| falsifier.text.clone());
        let narrator = self.narrator.evaluate(&RoleInput {
            antithesis: antithesis.as_deref(),
            ..with_thesis
        })?;

        let outputs = AgentOutputs {
            innovator,
            falsifier,
            narrator,
            provocateur,
        };
        for o in outputs.iter() {
            debug!(role = %o.role, stance = ?o.stance, agreement = o.agreement, "role output");
        }

        let conflicts = merge::detect_conflicts(&outputs);
        let primary = conflicts.first().cloned();
        let confidence = merge::confidence(&outputs, primary.as_ref());
        let synthesis_text = merge::synthesis_text(problem, &outputs, &conflicts);

        Ok(Plan {
            id: PlanId::generate(),
            catalyst_id: problem.catalyst_id.clone(),
            cycle: problem.cycle,
            thesis: outputs.innovator.text.clone(),
            antithesis,
            synthesis_text,
            confidence,
            agent_outputs: outputs,
            resolved_conflict: primary,
            attempt,
            created_at: Utc::now(),
        })
    }

    /// Evaluate until confidence clears the threshold or retries run out.
    ///
    /// A novelty violation or a plan without a resolved conflict is
    /// recorded as `PlanRejected` and returned as an error.
    pub async fn deliberate(&self, problem: &Problem) -> SynthesisResult<Deliberation> {
        let heuristics = self.relevant_heuristics(problem)?;
        let used: Vec<HeuristicId> = heuristics.iter().map(|h| h.id.clone()).collect();
        self.heuristics.touch(&used, problem.cycle)?;

        let mut findings: Vec<String> = Vec::new();
        let mut confidences = Vec::new();
        let mut attempt = 0u32;
        loop {
            let plan = match self.evaluate(problem, attempt, &findings, &heuristics).await {
                Ok(plan) => plan,
                Err(e @ SynthesisError::NoveltyViolation { .. }) => {
                    self.reject(problem, attempt, &e.to_string()).await?;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            self.record_question(&plan).await?;

            if let Err(e) = plan.validate() {
                warn!(plan = %plan.id, error = %e, "plan failed non-collusion check");
                self.reject(problem, attempt, &e.to_string()).await?;
                return Err(e.into());
            }

            confidences.push(plan.confidence);
            if plan.confidence >= self.config.confidence_threshold || attempt >= self.config.max_retries {
                if plan.confidence < self.config.confidence_threshold {
                    warn!(
                        catalyst = %problem.catalyst_id,
                        confidence = plan.confidence,
                        threshold = self.config.confidence_threshold,
                        retries = attempt,
                        "confidence below threshold after max retries"
                    );
                }
                return Ok(Deliberation {
                    plan,
                    retries_consumed: attempt,
                    confidences,
                    used_heuristics: used,
                });
            }

            debug!(
                catalyst = %problem.catalyst_id,
                attempt,
                confidence = plan.confidence,
                "confidence below threshold, re-evaluating"
            );
            findings = plan
                .agent_outputs
                .falsifier
                .findings
                .iter()
                .chain(&plan.agent_outputs.narrator.findings)
                .cloned()
                .collect();
            attempt += 1;
        }
    }

    /// Deliberate, then record the plan and its decision.
    pub async fn decide(&self, problem: &Problem) -> SynthesisResult<Synthesis> {
        let d = self.deliberate(problem).await?;
        let threshold = self.config.confidence_threshold;
        let decision = Decision::try_from_plan(&d.plan, threshold, d.retries_consumed)?;

        self.ledger
            .commit(
                OpKind::PlanProposed,
                &PlanProposed {
                    plan_id: d.plan.id.clone(),
                    catalyst_id: d.plan.catalyst_id.clone(),
                    stream: problem.stream.clone(),
                    cycle: problem.cycle,
                    confidence: d.plan.confidence,
                    novelty: d.plan.novelty(),
                    attempt: d.plan.attempt,
                    resolved_conflict: d.plan.resolved_conflict.clone(),
                },
            )
            .await?;
        self.ledger
            .commit(
                OpKind::DecisionRecorded,
                &DecisionRecorded {
                    decision_id: decision.id.clone(),
                    plan_id: decision.plan_id.clone(),
                    catalyst_id: decision.catalyst_id.clone(),
                    accepted: decision.accepted,
                    threshold_used: threshold,
                    retries_consumed: decision.retries_consumed,
                },
            )
            .await?;

        let store = self.ledger.store();
        store
            .put_json(Collection::Plans, d.plan.id.as_str(), &d.plan)
            .await?;
        store
            .put_json(Collection::Decisions, decision.id.as_str(), &decision)
            .await?;

        info!(
            decision = %decision.id,
            accepted = decision.accepted,
            confidence = decision.confidence,
            retries = decision.retries_consumed,
            "decision recorded"
        );
        Ok(Synthesis {
            plan: d.plan,
            decision,
            confidences: d.confidences,
            used_heuristics: d.used_heuristics,
        })
    }

    async fn record_question(&self, plan: &Plan) -> SynthesisResult<()> {
        let record = ProvocationRecord {
            question: plan.question().to_string(),
            novelty: plan.novelty(),
            plan_id: plan.id.clone(),
            catalyst_id: plan.catalyst_id.clone(),
            cycle: plan.cycle,
        };
        self.ledger
            .store()
            .put_json(Collection::Provocations, plan.id.as_str(), &record)
            .await?;
        Ok(())
    }

    async fn reject(&self, problem: &Problem, attempt: u32, reason: &str) -> SynthesisResult<()> {
        warn!(catalyst = %problem.catalyst_id, attempt, reason, "plan rejected");
        self.ledger
            .commit(
                OpKind::PlanRejected,
                &json!({
                    "catalyst_id": problem.catalyst_id,
                    "stream": problem.stream,
                    "cycle": problem.cycle,
                    "attempt": attempt,
                    "reason": reason,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_heuristics::HeuristicConfig;
    use crucible_store::InMemoryStore;
    use crucible_types::{CatalystId, ErrorClass, HeuristicSource, StreamId};

    struct Rig {
        ledger: Arc<Ledger>,
        heuristics: Arc<HeuristicStore>,
    }

    fn rig() -> Rig {
        let ledger = Arc::new(Ledger::new(Arc::new(InMemoryStore::new())));
        let heuristics = Arc::new(HeuristicStore::new(ledger.clone(), HeuristicConfig::default()));
        Rig { ledger, heuristics }
    }

    fn synthesizer(rig: &Rig, config: SynthesisConfig) -> Synthesizer {
        Synthesizer::new(
            rig.ledger.clone(),
            rig.heuristics.clone(),
            Arc::new(QuestionHistory::default()),
            config,
        )
    }

    fn problem(severity: f64) -> Problem {
        Problem {
            catalyst_id: CatalystId::generate(),
            stream: StreamId::primary(),
            cycle: 1,
            domain_tag: "latency".into(),
            severity,
            statement: "checkout latency spike after cache eviction".into(),
            internal: false,
        }
    }

    #[tokio::test]
    async fn high_severity_needs_a_retry() {
        let rig = rig();
        let synth = synthesizer(&rig, SynthesisConfig::default());
        let s = synth.decide(&problem(0.95)).await.unwrap();
        assert!(s.decision.accepted);
        assert_eq!(s.decision.retries_consumed, 1);
        assert_eq!(s.confidences.len(), 2);
        assert!(s.confidences[1] > s.confidences[0]);
        assert!(s.plan.thesis.contains("rollback"));
        assert!(s.plan.validate().is_ok());

        let proposed = rig.ledger.records_of(OpKind::PlanProposed).await.unwrap();
        let decided = rig.ledger.records_of(OpKind::DecisionRecorded).await.unwrap();
        assert_eq!((proposed.len(), decided.len()), (1, 1));
        assert_eq!(synth.history().len(), 2);
    }

    #[tokio::test]
    async fn unreachable_threshold_yields_rejected_decision() {
        let rig = rig();
        let config = SynthesisConfig {
            confidence_threshold: 0.99,
            max_retries: 2,
            ..SynthesisConfig::default()
        };
        let synth = synthesizer(&rig, config);
        let s = synth.decide(&problem(0.3)).await.unwrap();
        assert!(!s.decision.accepted);
        assert_eq!(s.decision.retries_consumed, 2);
        assert_eq!(s.decision.threshold_used, 0.99);
    }

    #[tokio::test]
    async fn exhausted_novelty_rejects_plan() {
        let rig = rig();
        let config = SynthesisConfig {
            max_novelty_attempts: 2,
            ..SynthesisConfig::default()
        };
        let synth = synthesizer(&rig, config);
        let p = problem(0.3);
        synth.decide(&p).await.unwrap();
        synth.decide(&p).await.unwrap();
        let err = synth.decide(&p).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::NoveltyViolation);
        let rejected = rig.ledger.records_of(OpKind::PlanRejected).await.unwrap();
        assert_eq!(rejected.len(), 1);
    }

    #[tokio::test]
    async fn relevant_heuristics_feed_the_thesis() {
        let rig = rig();
        rig.heuristics
            .write("warm the checkout cache before eviction", 1, HeuristicSource::Manual)
            .await
            .unwrap();
        rig.heuristics
            .write("rotate database credentials weekly", 1, HeuristicSource::Manual)
            .await
            .unwrap();
        let synth = synthesizer(&rig, SynthesisConfig::default());
        let d = synth.deliberate(&problem(0.3)).await.unwrap();
        assert_eq!(d.used_heuristics.len(), 1);
        assert!(d.plan.thesis.contains("warm the checkout cache"));
    }

    #[tokio::test]
    async fn history_survives_reload() {
        let rig = rig();
        let synth = synthesizer(&rig, SynthesisConfig::default());
        synth.decide(&problem(0.3)).await.unwrap();
        let history = Synthesizer::load_history(&rig.ledger).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}

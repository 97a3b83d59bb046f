use crate::error::{GenesisError, GenesisResult};
use crucible_heuristics::HeuristicStore;
use crucible_ledger::Ledger;
use crucible_synthesizer::{Deliberation, Problem, Synthesizer};
use crucible_types::text;
use crucible_types::{CatalystId, HeuristicId, HeuristicSource, OpKind, PlanId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Number of refinement passes. Fixed; genesis never recurses further.
pub const PASSES: u8 = 3;

pub const DOMAIN_PLACEHOLDER: &str = "<domain>";
pub const COMPONENT_PLACEHOLDER: &str = "<component>";
pub const DEPENDENCY_PLACEHOLDER: &str = "<dependency>";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenesisTrigger {
    Bootstrap,
    Plateau,
    Manual,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassReport {
    pub pass: u8,
    pub plan_id: PlanId,
    pub confidence: f64,
    pub output: String,
    pub heuristic_id: HeuristicId,
    /// Only pass 2 surfaces these.
    #[serde(default)]
    pub hidden_assumptions: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisReport {
    pub catalyst_id: CatalystId,
    pub trigger: GenesisTrigger,
    pub passes: Vec<PassReport>,
}

impl GenesisReport {
    /// Class-level solution from the last pass.
    pub fn generalized(&self) -> Option<&str> {
        self.passes.last().map(|p| p.output.as_str())
    }
}

/// Concrete terms of a problem and the placeholders that replace them.
struct Vocabulary {
    domain: String,
    component: Option<String>,
    dependency: Option<String>,
}

impl Vocabulary {
    fn of(problem: &Problem) -> Self {
        let mut terms = text::focus_terms(&problem.statement, 3).into_iter();
        Self {
            domain: problem.domain_tag.to_lowercase(),
            component: terms.next(),
            dependency: terms.next(),
        }
    }

    /// Replace concrete terms with class placeholders, word by word.
    fn generalize(&self, input: &str) -> String {
        input
            .split(' ')
            .map(|word| {
                let core = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
                let lower = core.to_lowercase();
                let stem = lower.strip_suffix('s').unwrap_or(&lower);
                let placeholder = if lower == self.domain {
                    Some(DOMAIN_PLACEHOLDER)
                } else if self.component.as_deref().map_or(false, |c| c == lower || c == stem) {
                    Some(COMPONENT_PLACEHOLDER)
                } else if self.dependency.as_deref().map_or(false, |d| d == lower || d == stem) {
                    Some(DEPENDENCY_PLACEHOLDER)
                } else {
                    None
                };
                match placeholder {
                    Some(p) if !core.is_empty() => word.replacen(core, p, 1),
                    _ => word.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Assumptions the pass-1 solution relies on without stating them.
pub fn hidden_assumptions(problem: &Problem, solution: &str) -> Vec<String> {
    let vocab = Vocabulary::of(problem);
    let lower = solution.to_lowercase();
    let mut out = Vec::new();
    if let (Some(c), Some(d)) = (&vocab.component, &vocab.dependency) {
        out.push(format!("isolating {c} does not starve {d}"));
    } else if let Some(c) = &vocab.component {
        out.push(format!("{c} can be isolated at all"));
    }
    if lower.contains("rollback") {
        out.push("a rollback restores the state that existed before the change".into());
    }
    if lower.contains("apply the rule") {
        out.push(format!(
            "rules learned elsewhere still hold for {}",
            vocab.domain
        ));
    }
    out.retain(|a| !lower.contains(a.as_str()));
    if out.is_empty() {
        out.push(format!(
            "the {} evidence reflects the real fault",
            vocab.domain
        ));
    }
    out
}

/// Genesis Engine.
pub struct GenesisEngine {
    synthesizer: Arc<Synthesizer>,
    heuristics: Arc<HeuristicStore>,
    ledger: Arc<Ledger>,
}

impl GenesisEngine {
    pub fn new(
        synthesizer: Arc<Synthesizer>,
        heuristics: Arc<HeuristicStore>,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            synthesizer,
            heuristics,
            ledger,
        }
    }

    async fn deliberate(&self, pass: u8, problem: &Problem) -> GenesisResult<Deliberation> {
        self.synthesizer
            .deliberate(problem)
            .await
            .map_err(|source| GenesisError::Pass { pass, source })
    }

    /// Run the three passes over `problem`.
    pub async fn run(&self, problem: &Problem, trigger: GenesisTrigger) -> GenesisResult<GenesisReport> {
        let vocab = Vocabulary::of(problem);
        let mut passes = Vec::with_capacity(PASSES as usize);

        // Pass 1: a concrete solution to this instance.
        let first = self.deliberate(1, problem).await?;
        let concrete = first.plan.synthesis_text.clone();
        let principle = format!("when {} degrades: {}", vocab.domain, lead_clause(&concrete));
        passes.push(
            self.finish(problem, trigger, 1, &first, concrete.clone(), principle, Vec::new())
                .await?,
        );

        // Pass 2: critique pass 1 and surface what it took for granted.
        let assumptions = hidden_assumptions(problem, &concrete);
        let second = self.deliberate(2, &problem.derive(concrete.clone())).await?;
        let critique = second.plan.antithesis.clone().unwrap_or_else(|| {
            format!(
                "the concrete fix survives review but rests on {} unstated assumption(s).",
                assumptions.len()
            )
        });
        let output = format!(
            "Critique: {} Challenge: {} Hidden assumptions: {}.",
            critique,
            second.plan.question(),
            assumptions.join("; ")
        );
        let principle = format!(
            "before fixing {}, verify that {}",
            vocab.domain,
            assumptions.join(" and that ")
        );
        passes.push(
            self.finish(problem, trigger, 2, &second, output, principle, assumptions.clone())
                .await?,
        );

        // Pass 3: solve the class, not the instance.
        let class_statement = vocab.generalize(&format!(
            "{} guarding against the assumption that {}",
            concrete.trim_end_matches('.'),
            assumptions.join(" and that ")
        ));
        let class_problem = Problem {
            domain_tag: DOMAIN_PLACEHOLDER.to_string(),
            ..problem.derive(class_statement)
        };
        let third = self.deliberate(3, &class_problem).await?;
        let generalized = vocab.generalize(&third.plan.synthesis_text);
        let principle = format!("for any {} anomaly: {}", DOMAIN_PLACEHOLDER, lead_clause(&generalized));
        passes.push(
            self.finish(problem, trigger, 3, &third, generalized, principle, Vec::new())
                .await?,
        );

        info!(catalyst = %problem.catalyst_id, ?trigger, "genesis complete");
        Ok(GenesisReport {
            catalyst_id: problem.catalyst_id.clone(),
            trigger,
            passes,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        problem: &Problem,
        trigger: GenesisTrigger,
        pass: u8,
        deliberation: &Deliberation,
        output: String,
        principle: String,
        hidden_assumptions: Vec<String>,
    ) -> GenesisResult<PassReport> {
        let heuristic = self
            .heuristics
            .write(principle, problem.cycle, HeuristicSource::Genesis { pass })
            .await?;
        self.ledger
            .commit(
                OpKind::GenesisPass,
                &json!({
                    "catalyst_id": problem.catalyst_id,
                    "stream": problem.stream,
                    "cycle": problem.cycle,
                    "trigger": trigger,
                    "pass": pass,
                    "plan_id": deliberation.plan.id,
                    "confidence": deliberation.plan.confidence,
                    "heuristic_id": heuristic.id,
                    "hidden_assumptions": hidden_assumptions,
                }),
            )
            .await?;
        info!(pass, heuristic = %heuristic.id, confidence = deliberation.plan.confidence, "genesis pass");
        Ok(PassReport {
            pass,
            plan_id: deliberation.plan.id.clone(),
            confidence: deliberation.plan.confidence,
            output,
            heuristic_id: heuristic.id,
            hidden_assumptions,
        })
    }
}

fn lead_clause(text: &str) -> &str {
    text.split(';')
        .next()
        .unwrap_or(text)
        .trim()
        .trim_end_matches('.')
}

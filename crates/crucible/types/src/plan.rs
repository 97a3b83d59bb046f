use crate::error::PlanValidationError;
use crate::ids::{CatalystId, Cycle, DecisionId, PlanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four fixed evaluator roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Innovator,
    Falsifier,
    Narrator,
    Provocateur,
}

impl RoleKind {
    pub const ALL: [RoleKind; 4] = [
        RoleKind::Innovator,
        RoleKind::Falsifier,
        RoleKind::Narrator,
        RoleKind::Provocateur,
    ];

    /// Weight of this role in the plan confidence.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Innovator => 0.35,
            Self::Falsifier => 0.30,
            Self::Narrator => 0.20,
            Self::Provocateur => 0.15,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Innovator => write!(f, "innovator"),
            Self::Falsifier => write!(f, "falsifier"),
            Self::Narrator => write!(f, "narrator"),
            Self::Provocateur => write!(f, "provocateur"),
        }
    }
}

/// Position a role takes towards the thesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Innovator's own proposal.
    Propose,
    /// No defect found.
    Approve,
    /// A defect was found (Falsifier antithesis).
    Object,
    /// Narrative incoherence flagged (Narrator).
    Flag,
    /// A novel question was raised (Provocateur).
    Question,
}

/// Output of one evaluator role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleOutput {
    pub role: RoleKind,
    pub stance: Stance,
    pub text: String,
    /// Support for the thesis in [0, 1].
    pub agreement: f64,
    /// Individual defects, incoherences or focus terms backing the stance.
    #[serde(default)]
    pub findings: Vec<String>,
    /// Provocateur only: 1 - max similarity against question history.
    #[serde(default)]
    pub novelty: Option<f64>,
}

impl RoleOutput {
    pub fn new(role: RoleKind, stance: Stance, text: impl Into<String>, agreement: f64) -> Self {
        Self {
            role,
            stance,
            text: text.into(),
            agreement: agreement.clamp(0.0, 1.0),
            findings: Vec::new(),
            novelty: None,
        }
    }

    pub fn with_findings(mut self, findings: Vec<String>) -> Self {
        self.findings = findings;
        self
    }

    pub fn with_novelty(mut self, novelty: f64) -> Self {
        self.novelty = Some(novelty.clamp(0.0, 1.0));
        self
    }

    pub fn dissents(&self) -> bool {
        matches!(self.stance, Stance::Object | Stance::Flag)
    }
}

/// Outputs of all four roles for one evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentOutputs {
    pub innovator: RoleOutput,
    pub falsifier: RoleOutput,
    pub narrator: RoleOutput,
    pub provocateur: RoleOutput,
}

impl AgentOutputs {
    pub fn get(&self, role: RoleKind) -> &RoleOutput {
        match role {
            RoleKind::Innovator => &self.innovator,
            RoleKind::Falsifier => &self.falsifier,
            RoleKind::Narrator => &self.narrator,
            RoleKind::Provocateur => &self.provocateur,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleOutput> {
        [
            &self.innovator,
            &self.falsifier,
            &self.narrator,
            &self.provocateur,
        ]
        .into_iter()
    }
}

/// The conflict between two roles that the merge step resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConflict {
    pub agent_a: RoleKind,
    pub agent_b: RoleKind,
    pub description: String,
}

/// Proposed resolution of a catalyst.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub catalyst_id: CatalystId,
    pub cycle: Cycle,
    pub thesis: String,
    pub antithesis: Option<String>,
    pub synthesis_text: String,
    pub confidence: f64,
    pub agent_outputs: AgentOutputs,
    /// Required for a Plan to become a Decision.
    pub resolved_conflict: Option<ResolvedConflict>,
    /// Zero-based evaluation attempt that produced this plan.
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Check the non-collusion invariant.
    pub fn validate(&self) -> Result<&ResolvedConflict, PlanValidationError> {
        let conflict = self
            .resolved_conflict
            .as_ref()
            .ok_or_else(|| PlanValidationError::MissingConflict(self.id.clone()))?;
        if conflict.agent_a == conflict.agent_b {
            return Err(PlanValidationError::SelfConflict(conflict.agent_a));
        }
        if conflict.description.trim().is_empty() {
            return Err(PlanValidationError::EmptyConflictDescription(
                self.id.clone(),
            ));
        }
        Ok(conflict)
    }

    /// Novelty achieved by the provocateur in this plan.
    pub fn novelty(&self) -> f64 {
        self.agent_outputs.provocateur.novelty.unwrap_or(0.0)
    }

    pub fn question(&self) -> &str {
        &self.agent_outputs.provocateur.text
    }
}

/// Finalized outcome for one plan. Terminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub plan_id: PlanId,
    pub catalyst_id: CatalystId,
    pub cycle: Cycle,
    pub accepted: bool,
    pub threshold_used: f64,
    pub retries_consumed: u32,
    pub confidence: f64,
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    /// Finalize a plan. Fails when the plan violates non-collusion.
    pub fn try_from_plan(
        plan: &Plan,
        threshold_used: f64,
        retries_consumed: u32,
    ) -> Result<Self, PlanValidationError> {
        plan.validate()?;
        Ok(Self {
            id: DecisionId::generate(),
            plan_id: plan.id.clone(),
            catalyst_id: plan.catalyst_id.clone(),
            cycle: plan.cycle,
            accepted: plan.confidence >= threshold_used,
            threshold_used,
            retries_consumed,
            confidence: plan.confidence,
            decided_at: Utc::now(),
        })
    }
}

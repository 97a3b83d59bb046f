//! Merge step: find the conflicts between role outputs, resolve the primary
//! one and score the plan.

use crate::problem::Problem;
use crate::roles::{finding, remedy};
use crucible_types::text;
use crucible_types::{AgentOutputs, ResolvedConflict, RoleKind};
use std::collections::BTreeMap;

/// Question-to-thesis similarity below which the provocateur counts as
/// challenging the thesis.
pub const CHALLENGE_SIMILARITY: f64 = 0.5;

/// Every conflict between two role outputs, strongest first: falsifier
/// objection, narrator flag, then provocateur challenge.
pub fn detect_conflicts(outputs: &AgentOutputs) -> Vec<ResolvedConflict> {
    let mut conflicts = Vec::new();
    if outputs.falsifier.dissents() {
        let codes: Vec<&str> = outputs
            .falsifier
            .findings
            .iter()
            .map(|f| finding::code(f))
            .collect();
        conflicts.push(ResolvedConflict {
            agent_a: RoleKind::Innovator,
            agent_b: RoleKind::Falsifier,
            description: format!(
                "falsifier objected ({}); the synthesis absorbs each objection as an explicit step",
                codes.join(", ")
            ),
        });
    }
    if outputs.narrator.dissents() {
        conflicts.push(ResolvedConflict {
            agent_a: RoleKind::Innovator,
            agent_b: RoleKind::Narrator,
            description: format!(
                "narrator flagged the account ({}); the synthesis re-anchors it on the catalyst",
                outputs.narrator.findings.len()
            ),
        });
    }
    let q = &outputs.provocateur.text;
    if !q.is_empty() && text::similarity(q, &outputs.innovator.text) < CHALLENGE_SIMILARITY {
        conflicts.push(ResolvedConflict {
            agent_a: RoleKind::Innovator,
            agent_b: RoleKind::Provocateur,
            description: format!(
                "provocateur challenged the thesis with \"{q}\"; the question is carried as an open check"
            ),
        });
    }
    conflicts
}

/// Weighted agreement after resolving `primary`: the weaker party of the
/// pair recovers half its gap to the stronger one.
pub fn confidence(outputs: &AgentOutputs, primary: Option<&ResolvedConflict>) -> f64 {
    let mut agreement: BTreeMap<RoleKind, f64> = outputs
        .iter()
        .map(|o| (o.role, o.agreement))
        .collect();
    if let Some(c) = primary {
        let a = agreement.get(&c.agent_a).copied().unwrap_or_default();
        let b = agreement.get(&c.agent_b).copied().unwrap_or_default();
        let (weak, gap) = if a < b {
            (c.agent_a, b - a)
        } else {
            (c.agent_b, a - b)
        };
        if let Some(v) = agreement.get_mut(&weak) {
            *v += gap / 2.0;
        }
    }
    agreement
        .iter()
        .map(|(role, v)| role.weight() * v)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Synthesis text: the thesis, each absorbed objection, and open checks.
pub fn synthesis_text(problem: &Problem, outputs: &AgentOutputs, conflicts: &[ResolvedConflict]) -> String {
    let mut parts = vec![outputs.innovator.text.trim_end_matches('.').to_string()];
    let thesis = outputs.innovator.text.to_lowercase();
    for f in outputs.falsifier.findings.iter().chain(&outputs.narrator.findings) {
        if let Some(step) = remedy(finding::code(f), problem) {
            if !thesis.contains(&step) {
                parts.push(step);
            }
        }
    }
    let mut text = format!("{}.", parts.join("; "));
    if conflicts.iter().any(|c| c.agent_b == RoleKind::Provocateur) {
        text.push_str(&format!(" Open check: {}", outputs.provocateur.text));
    }
    text
}

//! The four evaluators.
//!
//! Each role is a pure function of a [`RoleInput`] snapshot; no role sees
//! another role's state while evaluating. The falsifier and the provocateur
//! only need the thesis and run side by side; the narrator reads the
//! thesis/antithesis pair.

use crate::error::SynthesisResult;
use crate::novelty::QuestionHistory;
use crate::problem::Problem;
use crucible_types::text;
use crucible_types::{Heuristic, RoleKind, RoleOutput, Stance};
use std::sync::Arc;

/// Finding codes shared by the falsifier (which raises them) and the
/// innovator (which remedies them on the next attempt).
pub mod finding {
    pub const ROLLBACK: &str = "rollback";
    pub const SCOPE: &str = "scope";
    pub const RECONCILE: &str = "reconcile";
    pub const ANCHOR: &str = "anchor";
    pub const COHERENCE: &str = "coherence";

    pub fn code(finding: &str) -> &str {
        finding.split(':').next().unwrap_or_default().trim()
    }
}

/// Snapshot handed to a role.
#[derive(Clone, Copy, Debug)]
pub struct RoleInput<'a> {
    pub problem: &'a Problem,
    pub attempt: u32,
    /// Findings raised against the previous attempt.
    pub prior_findings: &'a [String],
    pub heuristics: &'a [Heuristic],
    pub thesis: Option<&'a str>,
    pub antithesis: Option<&'a str>,
}

pub trait Evaluate {
    fn role(&self) -> RoleKind;

    fn evaluate(&self, input: &RoleInput<'_>) -> SynthesisResult<RoleOutput>;
}

/// One of the four fixed evaluators.
pub enum Evaluator {
    Innovator(Innovator),
    Falsifier(Falsifier),
    Narrator(Narrator),
    Provocateur(Provocateur),
}

impl Evaluate for Evaluator {
    fn role(&self) -> RoleKind {
        match self {
            Self::Innovator(r) => r.role(),
            Self::Falsifier(r) => r.role(),
            Self::Narrator(r) => r.role(),
            Self::Provocateur(r) => r.role(),
        }
    }

    fn evaluate(&self, input: &RoleInput<'_>) -> SynthesisResult<RoleOutput> {
        match self {
            Self::Innovator(r) => r.evaluate(input),
            Self::Falsifier(r) => r.evaluate(input),
            Self::Narrator(r) => r.evaluate(input),
            Self::Provocateur(r) => r.evaluate(input),
        }
    }
}

/// Remedy clause the innovator adds for a finding code.
pub fn remedy(code: &str, problem: &Problem) -> Option<String> {
    match code {
        finding::ROLLBACK => Some("keep a rollback path ready before the change ships".into()),
        finding::SCOPE => Some(format!(
            "roll out within a single {} partition first",
            problem.domain_tag
        )),
        finding::RECONCILE => {
            Some("reconcile the conflicting constraints into one explicit rule".into())
        }
        finding::ANCHOR => Some(format!(
            "tie every step back to the {} evidence",
            problem.domain_tag
        )),
        _ => None,
    }
}

/// Proposes the thesis.
#[derive(Debug, Default)]
pub struct Innovator;

impl Evaluate for Innovator {
    fn role(&self) -> RoleKind {
        RoleKind::Innovator
    }

    fn evaluate(&self, input: &RoleInput<'_>) -> SynthesisResult<RoleOutput> {
        let problem = input.problem;
        let terms = text::focus_terms(&problem.statement, 3);
        let primary = terms.first().map(String::as_str).unwrap_or("the fault");
        let secondary = terms.get(1).map(String::as_str).unwrap_or("its dependents");

        let mut clauses = vec![format!(
            "contain the {} anomaly by isolating {} behind a guarded path for {}",
            problem.domain_tag, primary, secondary
        )];
        let mut seen = Vec::new();
        for f in input.prior_findings {
            let code = finding::code(f);
            if seen.contains(&code) {
                continue;
            }
            seen.push(code);
            if let Some(clause) = remedy(code, problem) {
                clauses.push(clause);
            }
        }
        for h in input.heuristics.iter().take(3) {
            clauses.push(format!("apply the rule '{}'", h.principle));
        }

        let applied = input.heuristics.len().min(3) as f64;
        let agreement = (0.55 + 0.1 * applied + 0.05 * f64::from(input.attempt)).min(0.95);
        let thesis = format!("{}.", clauses.join("; "));
        Ok(RoleOutput::new(RoleKind::Innovator, Stance::Propose, thesis, agreement)
            .with_findings(input.heuristics.iter().map(|h| h.id.to_string()).collect()))
    }
}

/// Tries to invalidate the thesis.
#[derive(Debug, Default)]
pub struct Falsifier;

impl Falsifier {
    pub fn defects(problem: &Problem, thesis: &str) -> Vec<String> {
        let lower = thesis.to_lowercase();
        let mut defects = Vec::new();
        if problem.severity >= 0.7 && !lower.contains("rollback") {
            defects.push(format!(
                "{}: no rollback path for a severity {:.2} change",
                finding::ROLLBACK,
                problem.severity
            ));
        }
        if problem.severity >= 0.9 && !lower.contains("within") {
            defects.push(format!(
                "{}: blast radius is unbounded",
                finding::SCOPE
            ));
        }
        if problem.internal && !lower.contains("reconcile") {
            defects.push(format!(
                "{}: the contradicting constraints are left standing",
                finding::RECONCILE
            ));
        }
        defects
    }
}

impl Evaluate for Falsifier {
    fn role(&self) -> RoleKind {
        RoleKind::Falsifier
    }

    fn evaluate(&self, input: &RoleInput<'_>) -> SynthesisResult<RoleOutput> {
        let thesis = input.thesis.unwrap_or_default();
        let defects = Self::defects(input.problem, thesis);
        if defects.is_empty() {
            return Ok(RoleOutput::new(
                RoleKind::Falsifier,
                Stance::Approve,
                "No defect found in the thesis.",
                0.9,
            ));
        }
        let agreement = (0.9 - 0.2 * defects.len() as f64).max(0.1);
        let text = format!("The thesis fails: {}.", defects.join("; "));
        Ok(RoleOutput::new(RoleKind::Falsifier, Stance::Object, text, agreement).with_findings(defects))
    }
}

/// Checks that thesis and antithesis tell one coherent story.
#[derive(Debug)]
pub struct Narrator {
    /// Overlap at which two thesis clauses count as contradictory.
    pub conflict_threshold: f64,
}

impl Narrator {
    pub fn new(conflict_threshold: f64) -> Self {
        Self { conflict_threshold }
    }
}

impl Evaluate for Narrator {
    fn role(&self) -> RoleKind {
        RoleKind::Narrator
    }

    fn evaluate(&self, input: &RoleInput<'_>) -> SynthesisResult<RoleOutput> {
        let thesis = input.thesis.unwrap_or_default();
        let mut flags = Vec::new();

        let subject = text::token_set(&input.problem.subject());
        let covered = text::token_set(thesis);
        if subject.intersection(&covered).next().is_none() {
            flags.push(format!(
                "{}: thesis never mentions the catalyst",
                finding::ANCHOR
            ));
        }

        let clauses: Vec<&str> = thesis
            .trim_end_matches('.')
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        for (i, a) in clauses.iter().enumerate() {
            for b in &clauses[i + 1..] {
                if text::contradicts(a, b, self.conflict_threshold) {
                    flags.push(format!(
                        "{}: '{}' contradicts '{}'",
                        finding::COHERENCE,
                        a,
                        b
                    ));
                }
            }
        }

        if !flags.is_empty() {
            let text = format!("The narrative is incoherent: {}.", flags.join("; "));
            return Ok(RoleOutput::new(RoleKind::Narrator, Stance::Flag, text, 0.45).with_findings(flags));
        }
        match input.antithesis {
            Some(_) => Ok(RoleOutput::new(
                RoleKind::Narrator,
                Stance::Approve,
                "Thesis and antithesis address the same failure; the objection can be absorbed.",
                0.75,
            )),
            None => Ok(RoleOutput::new(
                RoleKind::Narrator,
                Stance::Approve,
                "The thesis reads as one consistent account of the catalyst.",
                0.9,
            )),
        }
    }
}

/// Asks one question nobody has asked before.
pub struct Provocateur {
    history: Arc<QuestionHistory>,
    threshold: f64,
    max_attempts: u32,
}

impl Provocateur {
    pub fn new(history: Arc<QuestionHistory>, threshold: f64, max_attempts: u32) -> Self {
        Self {
            history,
            threshold,
            max_attempts,
        }
    }

    /// Question this role would ask, without claiming it.
    pub fn preview(&self, problem: &Problem) -> SynthesisResult<RoleOutput> {
        let c = self
            .history
            .preview(&problem.subject(), self.threshold, self.max_attempts)?;
        Ok(Self::output(c.question, c.novelty))
    }

    fn output(question: String, novelty: f64) -> RoleOutput {
        RoleOutput::new(
            RoleKind::Provocateur,
            Stance::Question,
            question,
            0.4 + 0.5 * novelty,
        )
        .with_novelty(novelty)
    }
}

impl Evaluate for Provocateur {
    fn role(&self) -> RoleKind {
        RoleKind::Provocateur
    }

    fn evaluate(&self, input: &RoleInput<'_>) -> SynthesisResult<RoleOutput> {
        let c = self
            .history
            .claim(&input.problem.subject(), self.threshold, self.max_attempts)?;
        Ok(Self::output(c.question, c.novelty))
    }
}

use crate::ids::{Cycle, VowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Machine-checkable form of a vow's text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "phrase", rename_all = "snake_case")]
pub enum VowRule {
    /// Content must not contain the phrase.
    Forbid(String),
    /// Content must contain the phrase.
    Require(String),
    /// Logged, never blocks.
    Advisory,
}

impl VowRule {
    /// Compile vow text.
    ///
    /// `never|no|forbid|avoid <phrase>` forbids, `always|must|require <phrase>`
    /// requires, anything else is advisory.
    pub fn compile(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        let mut parts = normalized.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or_default();
        let phrase = parts
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(['.', '!', ';', ','])
            .trim()
            .to_string();
        if phrase.is_empty() {
            return Self::Advisory;
        }
        match head {
            "never" | "no" | "forbid" | "avoid" => Self::Forbid(phrase),
            "always" | "must" | "require" => Self::Require(phrase),
            _ => Self::Advisory,
        }
    }

    /// True when `content` breaks this rule.
    pub fn violated_by(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        match self {
            Self::Forbid(phrase) => lowered.contains(phrase.as_str()),
            Self::Require(phrase) => !lowered.contains(phrase.as_str()),
            Self::Advisory => false,
        }
    }
}

/// A declared constraint with adherence log and liberation state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vow {
    pub id: VowId,
    pub text: String,
    pub rule: VowRule,
    pub min_cycles: u64,
    pub declared_at_cycle: Cycle,
    pub adherence_log: BTreeMap<Cycle, bool>,
    pub liberated: bool,
    pub liberation_justification: Option<String>,
    pub liberated_at_cycle: Option<Cycle>,
}

impl Vow {
    pub fn new(text: impl Into<String>, min_cycles: u64, declared_at_cycle: Cycle) -> Self {
        let text = text.into();
        Self {
            id: VowId::generate(),
            rule: VowRule::compile(&text),
            text,
            min_cycles,
            declared_at_cycle,
            adherence_log: BTreeMap::new(),
            liberated: false,
            liberation_justification: None,
            liberated_at_cycle: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.liberated
    }

    pub fn eligible_for_liberation(&self, current_cycle: Cycle) -> bool {
        current_cycle.saturating_sub(self.declared_at_cycle) >= self.min_cycles
    }

    /// Fraction of logged cycles in which the vow held.
    pub fn adherence_ratio(&self) -> f64 {
        if self.adherence_log.is_empty() {
            return 1.0;
        }
        let held = self.adherence_log.values().filter(|v| **v).count();
        held as f64 / self.adherence_log.len() as f64
    }
}

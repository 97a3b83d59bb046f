use crate::ids::{Cycle, HeuristicId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicStatus {
    Active,
    /// Class-level generalization produced by the genesis engine.
    /// Behaves like `Active` for reads, reinforcement and decay.
    Synthesized,
    /// Replaced by a synthesized child. Retained for lineage.
    Deprecated,
}

impl HeuristicStatus {
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Deprecated)
    }
}

impl fmt::Display for HeuristicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Synthesized => write!(f, "SYNTHESIZED"),
            Self::Deprecated => write!(f, "DEPRECATED"),
        }
    }
}

/// How a heuristic entered the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeuristicSource {
    /// Learned from an accepted decision.
    Decision,
    /// Written by one genesis pass (1..=3).
    Genesis { pass: u8 },
    /// Child of two conflicting parents.
    Synthesis {
        parent_a: HeuristicId,
        parent_b: HeuristicId,
    },
    /// Declared by an operator.
    Manual,
}

/// Snapshot of a heuristic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heuristic {
    pub id: HeuristicId,
    pub principle: String,
    pub confidence: f64,
    pub origin_cycle: Cycle,
    pub status: HeuristicStatus,
    pub conflicts: Vec<HeuristicId>,
    pub last_touched_cycle: Cycle,
    pub reinforcements: u64,
    pub superseded_by: Option<HeuristicId>,
    pub source: HeuristicSource,
}

impl Heuristic {
    /// Ranking score for READ: `confidence * recency`.
    pub fn score(&self, current_cycle: Cycle) -> f64 {
        let age = current_cycle.saturating_sub(self.last_touched_cycle) as f64;
        self.confidence * (1.0 / (1.0 + age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristic(confidence: f64, touched: Cycle) -> Heuristic {
        Heuristic {
            id: HeuristicId::generate(),
            principle: "prefer bounded retries".into(),
            confidence,
            origin_cycle: 0,
            status: HeuristicStatus::Active,
            conflicts: vec![],
            last_touched_cycle: touched,
            reinforcements: 0,
            superseded_by: None,
            source: HeuristicSource::Manual,
        }
    }

    #[test]
    fn score_prefers_recent() {
        let fresh = heuristic(0.5, 10);
        let stale = heuristic(0.5, 2);
        assert!(fresh.score(10) > stale.score(10));
        assert!((fresh.score(10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn deprecated_is_not_live() {
        assert!(HeuristicStatus::Active.is_live());
        assert!(HeuristicStatus::Synthesized.is_live());
        assert!(!HeuristicStatus::Deprecated.is_live());
    }
}

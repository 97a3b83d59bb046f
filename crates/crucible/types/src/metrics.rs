use crate::ids::Cycle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score names carried by every snapshot.
pub mod score {
    pub const ACCEPTANCE_RATE: &str = "acceptance_rate";
    pub const NOVELTY_RATE: &str = "novelty_rate";
    pub const SCAFFOLD_STABILITY: &str = "scaffold_stability";
    pub const VOW_LIBERATION_RATE: &str = "vow_liberation_rate";
    pub const GENESIS_REPRODUCTION_RATE: &str = "genesis_reproduction_rate";
    pub const FIDELITY: &str = "fidelity";
    pub const HEURISTIC_MEAN_CONFIDENCE: &str = "heuristic_mean_confidence";
}

/// Composite scores for one completed cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cycle: Cycle,
    pub scores: BTreeMap<String, f64>,
}

impl MetricsSnapshot {
    pub fn new(cycle: Cycle) -> Self {
        Self {
            cycle,
            scores: BTreeMap::new(),
        }
    }

    pub fn with_score(mut self, name: &str, value: f64) -> Self {
        self.scores.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> f64 {
        self.scores.get(name).copied().unwrap_or(0.0)
    }

    /// Bitwise comparison of scores, used to check idempotent recomputation.
    pub fn bit_identical(&self, other: &MetricsSnapshot) -> bool {
        self.cycle == other.cycle
            && self.scores.len() == other.scores.len()
            && self
                .scores
                .iter()
                .zip(other.scores.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va.to_bits() == vb.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_score_is_zero() {
        let s = MetricsSnapshot::new(1).with_score(score::FIDELITY, 0.9);
        assert_eq!(s.get(score::FIDELITY), 0.9);
        assert_eq!(s.get(score::NOVELTY_RATE), 0.0);
    }

    #[test]
    fn bit_identical_compares_bits() {
        let a = MetricsSnapshot::new(1).with_score("x", 0.1 + 0.2);
        let b = MetricsSnapshot::new(1).with_score("x", 0.1 + 0.2);
        let c = MetricsSnapshot::new(1).with_score("x", 0.3);
        assert!(a.bit_identical(&b));
        assert!(!a.bit_identical(&c));
    }
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Minimum confidence (delta) for an accepted decision.
    pub confidence_threshold: f64,
    /// Re-evaluations allowed after the first attempt.
    pub max_retries: u32,
    /// A question is novel when its similarity to every prior question is
    /// strictly below this (tau).
    pub novelty_threshold: f64,
    /// Candidate questions tried before giving up.
    pub max_novelty_attempts: u32,
    /// Heuristics offered to the innovator.
    pub top_k_heuristics: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_retries: 3,
            novelty_threshold: 0.6,
            max_novelty_attempts: 24,
            top_k_heuristics: 3,
        }
    }
}

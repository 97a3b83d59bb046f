use serde::{Deserialize, Serialize};

/// Tuning for the heuristic store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Confidence assigned on WRITE and to synthesized children.
    pub initial_confidence: f64,
    /// Confidence added by one REINFORCE (δ).
    pub reinforce_step: f64,
    /// Confidence removed per idle cycle by DECAY (ε).
    pub decay_step: f64,
    /// Below this a conflicting heuristic is synthesized away.
    pub synthesis_floor: f64,
    /// Overlap required for two principles to count as contradictory.
    pub conflict_threshold: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            initial_confidence: 0.5,
            reinforce_step: 0.1,
            decay_step: 0.02,
            synthesis_floor: 0.25,
            conflict_threshold: 0.5,
        }
    }
}

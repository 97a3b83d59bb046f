use serde::{Deserialize, Serialize};

/// Stop Rule windows and targets.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StopRuleConfig {
    /// Cycles the acceptance trend must be non-decreasing over (`k`).
    /// Also the plateau window.
    pub trend_window: u64,
    /// Cycles a qualifying novelty event may lie in the past (`r`).
    pub novelty_window: u64,
    pub novelty_target: f64,
    pub fidelity_target: f64,
    /// Plan confidences spreading less than this over `k` plans plateau.
    pub plateau_epsilon: f64,
    /// Provocateur novelty that counts as a qualifying event.
    pub novelty_event_min: f64,
}

impl Default for StopRuleConfig {
    fn default() -> Self {
        Self {
            trend_window: 3,
            novelty_window: 5,
            novelty_target: 0.5,
            fidelity_target: 0.9,
            plateau_epsilon: 0.02,
            novelty_event_min: 0.8,
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Overlap at which two opposite-polarity constraints contradict.
    pub conflict_threshold: f64,
    /// Severity of the catalyst raised for a contradiction.
    pub contradiction_severity: f64,
    /// TTL used when a scaffold is declared without one.
    pub default_ttl_cycles: u64,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            conflict_threshold: 0.5,
            contradiction_severity: 0.9,
            default_ttl_cycles: 5,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record collections kept beside the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Catalysts,
    Plans,
    Decisions,
    Artifacts,
    MetricsSnapshots,
    Vows,
    Scaffolds,
    Heuristics,
    /// Provocateur question history.
    Provocations,
    /// Cursors, keys and other singleton kernel state.
    KernelState,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::Catalysts,
        Collection::Plans,
        Collection::Decisions,
        Collection::Artifacts,
        Collection::MetricsSnapshots,
        Collection::Vows,
        Collection::Scaffolds,
        Collection::Heuristics,
        Collection::Provocations,
        Collection::KernelState,
    ];

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Catalysts => "catalysts",
            Self::Plans => "plans",
            Self::Decisions => "decisions",
            Self::Artifacts => "artifacts",
            Self::MetricsSnapshots => "metrics_snapshots",
            Self::Vows => "vows",
            Self::Scaffolds => "scaffolds",
            Self::Heuristics => "heuristics",
            Self::Provocations => "provocations",
            Self::KernelState => "kernel_state",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// One row of the derived lineage view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRow {
    pub artifact_id: String,
    pub decision_id: Option<String>,
    pub plan_id: Option<String>,
    pub catalyst_id: Option<String>,
    pub ledger_seq: Option<u64>,
}

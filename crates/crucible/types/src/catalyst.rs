use crate::ids::{CatalystId, ScaffoldId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a catalyst came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalystOrigin {
    /// Selected from external telemetry.
    Telemetry { source: String },
    /// Synthesized by the scaffold manager from two contradictory scaffolds.
    ScaffoldContradiction {
        scaffold_a: ScaffoldId,
        scaffold_b: ScaffoldId,
    },
}

/// The single highest-priority anomaly selected for a cycle.
///
/// Immutable once created; consumed exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalyst {
    pub id: CatalystId,
    pub severity: f64,
    pub source_evidence: String,
    pub domain_tag: String,
    /// Timestamp of the originating signal (tie-break key).
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub origin: CatalystOrigin,
}

impl Catalyst {
    pub fn new(
        severity: f64,
        source_evidence: impl Into<String>,
        domain_tag: impl Into<String>,
        observed_at: DateTime<Utc>,
        origin: CatalystOrigin,
    ) -> Self {
        Self {
            id: CatalystId::generate(),
            severity,
            source_evidence: source_evidence.into(),
            domain_tag: domain_tag.into(),
            observed_at,
            created_at: Utc::now(),
            origin,
        }
    }

    /// Problem statement handed to the synthesizer.
    pub fn statement(&self) -> String {
        format!(
            "[{}] severity {:.3}: {}",
            self.domain_tag, self.severity, self.source_evidence
        )
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.origin, CatalystOrigin::ScaffoldContradiction { .. })
    }
}

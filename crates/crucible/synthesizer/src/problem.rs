use crucible_types::{Catalyst, CatalystId, Cycle, StreamId};
use serde::{Deserialize, Serialize};

/// Immutable input of one deliberation: a catalyst, or a genesis
/// sub-problem derived from one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub catalyst_id: CatalystId,
    pub stream: StreamId,
    pub cycle: Cycle,
    pub domain_tag: String,
    pub severity: f64,
    pub statement: String,
    /// Raised by the system itself (scaffold contradiction).
    pub internal: bool,
}

impl Problem {
    pub fn from_catalyst(catalyst: &Catalyst, stream: StreamId, cycle: Cycle) -> Self {
        Self {
            catalyst_id: catalyst.id.clone(),
            stream,
            cycle,
            domain_tag: catalyst.domain_tag.clone(),
            severity: catalyst.severity,
            statement: catalyst.source_evidence.clone(),
            internal: catalyst.is_internal(),
        }
    }

    /// Same catalyst, new statement.
    pub fn derive(&self, statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..self.clone()
        }
    }

    /// Text the roles mine for focus terms.
    pub fn subject(&self) -> String {
        format!("{} {}", self.domain_tag, self.statement)
    }
}

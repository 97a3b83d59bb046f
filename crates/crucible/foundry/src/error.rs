use crate::lint::LintFinding;
use crucible_ledger::LedgerError;
use crucible_store::StoreError;
use crucible_types::{ArtifactKind, ErrorClass, VowId};
use crucible_vows::VowError;
use thiserror::Error;

pub type FoundryResult<T> = Result<T, FoundryError>;

#[derive(Debug, Error)]
pub enum FoundryError {
    /// Lint or vow gate failure; nothing was published.
    #[error("{kind} artifact failed validation: {}", summarize(.findings))]
    Validation {
        kind: ArtifactKind,
        findings: Vec<LintFinding>,
        violated_vows: Vec<VowId>,
    },

    #[error("system key unusable: {0}")]
    Key(String),

    #[error(transparent)]
    Vow(#[from] VowError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn summarize(findings: &[LintFinding]) -> String {
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FoundryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } => ErrorClass::ValidationError,
            Self::Key(_) => ErrorClass::Storage,
            Self::Vow(e) => e.class(),
            Self::Ledger(e) => e.class(),
            Self::Store(e) => e.class(),
        }
    }

    /// Vows this failure broke, for adherence logging.
    pub fn violated_vows(&self) -> &[VowId] {
        match self {
            Self::Validation { violated_vows, .. } => violated_vows,
            _ => &[],
        }
    }
}

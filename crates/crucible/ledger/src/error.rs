use crucible_store::StoreError;
use crucible_types::ErrorClass;
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Recomputing the chain did not reproduce a stored value.
    #[error("chain integrity violation at seq {seq}: {reason}")]
    Integrity { seq: u64, reason: String },

    /// A retained payload no longer matches its committed digest.
    #[error("payload digest mismatch at seq {seq}")]
    PayloadMismatch { seq: u64 },

    #[error("ledger write collided {attempts} times; giving up")]
    Concurrency { attempts: u32 },

    #[error("lineage broken: {0}")]
    LineageBroken(String),

    #[error("no published artifact with id {0}")]
    UnknownArtifact(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Integrity { .. } | Self::PayloadMismatch { .. } | Self::LineageBroken(_) => {
                ErrorClass::IntegrityError
            }
            Self::Concurrency { .. } => ErrorClass::ConcurrencyError,
            Self::UnknownArtifact(_) => ErrorClass::Storage,
            Self::Serialization(_) => ErrorClass::Internal,
            Self::Store(e) => e.class(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

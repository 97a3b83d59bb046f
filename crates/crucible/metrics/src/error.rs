use crucible_ledger::LedgerError;
use crucible_store::StoreError;
use crucible_types::ErrorClass;
use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("evidence pack could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MetricsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Encode(_) => ErrorClass::Internal,
            Self::Ledger(e) => e.class(),
            Self::Store(e) => e.class(),
        }
    }
}

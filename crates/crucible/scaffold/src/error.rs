use crucible_ledger::LedgerError;
use crucible_store::StoreError;
use crucible_types::{ErrorClass, ScaffoldId};
use thiserror::Error;

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("unknown scaffold {0}")]
    Unknown(ScaffoldId),

    #[error("constraint text must not be empty")]
    EmptyConstraint,

    #[error("scaffold registry lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScaffoldError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Ledger(e) => e.class(),
            Self::Store(e) => e.class(),
            Self::Unknown(_) => ErrorClass::Storage,
            Self::EmptyConstraint => ErrorClass::ValidationError,
            Self::LockPoisoned => ErrorClass::Internal,
        }
    }
}

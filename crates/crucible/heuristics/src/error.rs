use crucible_ledger::LedgerError;
use crucible_store::StoreError;
use crucible_types::{ErrorClass, HeuristicId};
use thiserror::Error;

pub type HeuristicResult<T> = Result<T, HeuristicError>;

#[derive(Debug, Error)]
pub enum HeuristicError {
    #[error("unknown heuristic {0}")]
    Unknown(HeuristicId),

    #[error("heuristic {0} is deprecated")]
    Deprecated(HeuristicId),

    #[error("heuristics {0} and {1} have no registered conflict")]
    NotConflicting(HeuristicId, HeuristicId),

    #[error("cannot synthesize heuristic {0} with itself")]
    SelfSynthesis(HeuristicId),

    #[error("principle must not be empty")]
    EmptyPrinciple,

    #[error("heuristic arena lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HeuristicError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Ledger(e) => e.class(),
            Self::Store(e) => e.class(),
            Self::Unknown(_) => ErrorClass::Storage,
            Self::LockPoisoned => ErrorClass::Internal,
            _ => ErrorClass::ValidationError,
        }
    }
}

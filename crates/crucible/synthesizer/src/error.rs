use crucible_heuristics::HeuristicError;
use crucible_ledger::LedgerError;
use crucible_store::StoreError;
use crucible_types::{ErrorClass, PlanValidationError};
use thiserror::Error;

pub type SynthesisResult<T> = Result<T, SynthesisError>;

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The provocateur found no question below the similarity threshold.
    #[error("novelty violation: no novel question after {attempts} candidate(s) (best similarity {best_similarity:.3})")]
    NoveltyViolation { attempts: u32, best_similarity: f64 },

    /// The merge found no conflict to resolve; the plan may not become a decision.
    #[error("non-collusion check failed: {0}")]
    Collusion(#[from] PlanValidationError),

    #[error("question history lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Heuristic(#[from] HeuristicError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SynthesisError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoveltyViolation { .. } => ErrorClass::NoveltyViolation,
            Self::Collusion(e) => e.class(),
            Self::LockPoisoned => ErrorClass::Internal,
            Self::Heuristic(e) => e.class(),
            Self::Ledger(e) => e.class(),
            Self::Store(e) => e.class(),
        }
    }
}

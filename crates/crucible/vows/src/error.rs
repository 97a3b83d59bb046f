use crucible_ledger::LedgerError;
use crucible_store::StoreError;
use crucible_types::{Cycle, ErrorClass, VowId};
use thiserror::Error;

pub type VowResult<T> = Result<T, VowError>;

#[derive(Debug, Error)]
pub enum VowError {
    #[error("unknown vow {0}")]
    Unknown(VowId),

    #[error("vow text must not be empty")]
    EmptyText,

    #[error("vow {0} is already liberated")]
    AlreadyLiberated(VowId),

    #[error("vow {vow} cannot be liberated before cycle {eligible_at} (now {current})")]
    TooEarly {
        vow: VowId,
        current: Cycle,
        eligible_at: Cycle,
    },

    #[error("liberation requires a non-empty justification")]
    EmptyJustification,

    #[error("vow registry lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VowError {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_early_message() {
        let err = VowError::TooEarly {
            vow: VowId::new("vow-1"),
            current: 2,
            eligible_at: 3,
        };
        assert_eq!(
            err.to_string(),
            "vow vow-1 cannot be liberated before cycle 3 (now 2)"
        );
        assert_eq!(err.class(), ErrorClass::ValidationError);
    }
}

use crate::ids::PlanId;
use crate::plan::RoleKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error taxonomy shared by every component and the CLI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    NoSignal,
    NoveltyViolation,
    SynthesisFailure,
    ValidationError,
    ConcurrencyError,
    IntegrityError,
    Config,
    Storage,
    Internal,
}

impl ErrorClass {
    /// Process exit code for this class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Internal => 1,
            Self::Config => 2,
            Self::Storage => 3,
            Self::NoSignal => 10,
            Self::NoveltyViolation => 11,
            Self::SynthesisFailure => 12,
            Self::ValidationError => 13,
            Self::ConcurrencyError => 14,
            Self::IntegrityError => 15,
        }
    }

    /// Whether the class is ever recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IntegrityError)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoSignal => "NoSignalError",
            Self::NoveltyViolation => "NoveltyViolation",
            Self::SynthesisFailure => "SynthesisFailure",
            Self::ValidationError => "ValidationError",
            Self::ConcurrencyError => "ConcurrencyError",
            Self::IntegrityError => "IntegrityError",
            Self::Config => "ConfigError",
            Self::Storage => "StorageError",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// A plan that may not become a decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanValidationError {
    #[error("plan {0} has no resolved conflict")]
    MissingConflict(PlanId),

    #[error("resolved conflict must involve two different roles, got {0} twice")]
    SelfConflict(RoleKind),

    #[error("plan {0} has an empty conflict description")]
    EmptyConflictDescription(PlanId),
}

impl PlanValidationError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::ValidationError
    }
}

use crate::cursor::CycleState;
use crucible_foundry::FoundryError;
use crucible_genesis::GenesisError;
use crucible_heuristics::HeuristicError;
use crucible_ledger::LedgerError;
use crucible_metrics::MetricsError;
use crucible_scaffold::ScaffoldError;
use crucible_scanner::ScanError;
use crucible_store::StoreError;
use crucible_synthesizer::SynthesisError;
use crucible_types::{ContentHash, ErrorClass, StreamId};
use crucible_vows::VowError;
use thiserror::Error;

pub type KernelResult<T> = Result<T, KernelError>;

/// Errors from the crucible kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("stream {stream} is in {found}, expected {expected}")]
    WrongState {
        stream: StreamId,
        expected: CycleState,
        found: CycleState,
    },

    #[error("stream {stream} halted (evidence {digest})")]
    Halted { stream: StreamId, digest: ContentHash },

    #[error("stream {0} is halted pending external audit")]
    AuditRequired(StreamId),

    #[error("cycle {cycle} aborted: {reason}")]
    Aborted { cycle: u64, reason: String },

    #[error("missing {what} for stream {stream}")]
    Missing { stream: StreamId, what: &'static str },

    #[error("unknown self test '{0}'")]
    UnknownSelfTest(String),

    #[error("stream worker failed: {0}")]
    Worker(String),

    #[error("self test failed: {}", .failed.join(", "))]
    SelfTestFailed { failed: Vec<String>, class: ErrorClass },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error(transparent)]
    Foundry(#[from] FoundryError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Heuristic(#[from] HeuristicError),

    #[error(transparent)]
    Vow(#[from] VowError),

    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl KernelError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::UnknownSelfTest(_) => ErrorClass::Config,
            Self::WrongState { .. } | Self::Missing { .. } => ErrorClass::ValidationError,
            Self::Halted { .. } | Self::Aborted { .. } | Self::Worker(_) => ErrorClass::Internal,
            Self::AuditRequired(_) => ErrorClass::IntegrityError,
            Self::SelfTestFailed { class, .. } => *class,
            Self::Scan(e) => e.class(),
            Self::Synthesis(e) => e.class(),
            Self::Genesis(e) => e.class(),
            Self::Foundry(e) => e.class(),
            Self::Metrics(e) => e.class(),
            Self::Heuristic(e) => e.class(),
            Self::Vow(e) => e.class(),
            Self::Scaffold(e) => e.class(),
            Self::Ledger(e) => e.class(),
            Self::Store(e) => e.class(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.class().exit_code()
    }
}

use crucible_heuristics::HeuristicError;
use crucible_ledger::LedgerError;
use crucible_synthesizer::SynthesisError;
use crucible_types::ErrorClass;
use thiserror::Error;

pub type GenesisResult<T> = Result<T, GenesisError>;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("genesis pass {pass} failed: {source}")]
    Pass {
        pass: u8,
        #[source]
        source: SynthesisError,
    },

    #[error(transparent)]
    Heuristic(#[from] HeuristicError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl GenesisError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Pass { source, .. } => source.class(),
            Self::Heuristic(e) => e.class(),
            Self::Ledger(e) => e.class(),
        }
    }
}

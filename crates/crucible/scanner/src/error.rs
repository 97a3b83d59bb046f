use crucible_types::ErrorClass;
use std::path::PathBuf;
use thiserror::Error;

pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Nothing to select from. Reported, never retried.
    #[error("no signal: {0}")]
    NoSignal(String),

    #[error("failed to read telemetry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed telemetry in {path} (line {line}): {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl ScanError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoSignal(_) => ErrorClass::NoSignal,
            Self::Io { .. } | Self::Parse { .. } => ErrorClass::Config,
        }
    }
}

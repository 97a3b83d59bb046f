//! # crucible-scanner
//!
//! Turns external telemetry into exactly one [`crucible_types::Catalyst`]
//! per cycle: the record with maximum severity, ties broken by earliest
//! timestamp and then by domain tag. An empty input is a `NoSignal` error.

#![deny(unsafe_code)]

mod error;
mod scanner;
mod source;

pub use error::{ScanError, ScanResult};
pub use scanner::{rank, select, Selection, TelemetryScanner};
pub use source::{JsonDirSource, SignalRecord, SignalSource, StaticSignals};

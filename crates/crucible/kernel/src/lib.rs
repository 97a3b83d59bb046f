//! # crucible-kernel
//!
//! Wires every component to one store and drives catalyst streams through
//! the cycle state machine:
//!
//! ```text
//! SCAN -> ARCHITECT -> EXECUTE -> INTEGRATE -> SCAN
//!                                     |
//!                                     +-> HALTED (Stop Rule met)
//! ```
//!
//! Each stream persists its position as a [`Cursor`], so single steps can
//! be driven by separate processes (one CLI command per state) as well as
//! by [`Orchestrator::run_cycle`]. Several streams may share one
//! [`Crucible`]; they serialize on the ledger tip and the internal catalyst
//! queue and nowhere else.

#![deny(unsafe_code)]

pub mod config;
mod cursor;
mod error;
mod orchestrator;
mod runtime;
pub mod selftest;
mod streams;

pub use config::{CrucibleConfig, CycleConfig, LedgerConfig, LoggingConfig, StoreConfig, TelemetryConfig};
pub use cursor::{enqueue, pending, CatalystRecord, CatalystStatus, Cursor, CycleState};
pub use error::{KernelError, KernelResult};
pub use orchestrator::{
    ArchitectOutcome, ArtifactSummary, AuditClearance, CycleOutcome, CycleReport, ExecuteOutcome,
    IntegrateOutcome, MetricsReport, Orchestrator, ScanOutcome,
};
pub use runtime::Crucible;
pub use selftest::{CheckResult, SelfTestId, SelfTestReport};
pub use streams::{run_streams, stream_id, StreamPlan, StreamReport};

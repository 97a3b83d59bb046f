//! # crucible-heuristics
//!
//! Heuristic Store (HPL): a persistent, queryable collection of
//! confidence-scored rules.
//!
//! - `READ(top_k)` ranks live heuristics by `confidence * recency`
//! - `WRITE` adds a rule and registers conflicts with contradicting rules
//! - `REINFORCE` is the only way confidence goes up
//! - `DECAY` is the only way confidence goes down
//! - `SYNTHESIZE` is the only way a heuristic becomes deprecated
//!
//! Confidence lives in per-heuristic atomics so REINFORCE and DECAY from
//! concurrent catalyst streams never block each other.

#![deny(unsafe_code)]

mod cell;
pub mod config;
mod error;
mod store;

pub use config::HeuristicConfig;
pub use error::{HeuristicError, HeuristicResult};
pub use store::{DecayReport, HeuristicStore, SynthesisOutcome};

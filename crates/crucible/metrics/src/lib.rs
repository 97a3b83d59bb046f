//! # crucible-metrics
//!
//! Composite scores per completed cycle, plateau detection and the Stop
//! Rule.
//!
//! A [`MetricsSnapshot`](crucible_types::MetricsSnapshot) is a pure function
//! of ledger, heuristic and scaffold state: computing it twice from the same
//! state yields bit-identical scores. The Stop Rule halts a stream when the
//! acceptance trend holds, novelty and fidelity meet their targets, and
//! either a qualifying novelty event happened recently or a plateau
//! coincides with a vow liberation. A halt is documented by a signed
//! [`EvidencePack`].

#![deny(unsafe_code)]

pub mod config;
mod engine;
mod error;
mod evidence;
mod scores;
mod stop_rule;

pub use config::StopRuleConfig;
pub use engine::MetricsEngine;
pub use error::{MetricsError, MetricsResult};
pub use evidence::{EvidenceBody, EvidencePack};
pub use scores::{
    compute_snapshot, detect_plateau, genesis_reproduction_rate, mean_live_confidence,
    LedgerFacts, Liberation, PlanFact,
};
pub use stop_rule::{evaluate, StopRuleEvaluation};

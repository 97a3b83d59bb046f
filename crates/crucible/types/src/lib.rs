//! # crucible-types
//!
//! Shared data model for the autonomous decision cycle.
//!
//! Every other crucible crate speaks in these types: catalysts selected by
//! the scanner, plans and decisions produced by the synthesizer, artifacts
//! published by the foundry, and the hash-chained entries that the ledger
//! stores. Content hashing and the token-set text metrics used for novelty
//! and contradiction checks also live here.

#![deny(unsafe_code)]

pub mod artifact;
pub mod catalyst;
pub mod error;
pub mod hash;
pub mod heuristic;
pub mod ids;
pub mod ledger;
pub mod metrics;
pub mod plan;
pub mod scaffold;
pub mod text;
pub mod vow;

pub use artifact::{digest_of, Artifact, ArtifactKind, Provenance};
pub use catalyst::{Catalyst, CatalystOrigin};
pub use error::{ErrorClass, PlanValidationError};
pub use hash::{hex_decode, hex_encode, ContentHash, ContentHashError};
pub use heuristic::{Heuristic, HeuristicSource, HeuristicStatus};
pub use ids::{
    ArtifactId, CatalystId, Cycle, DecisionId, HeuristicId, PlanId, ScaffoldId, StreamId, VowId,
};
pub use ledger::{compute_hash, LedgerEntry, LedgerRecord, OpKind};
pub use metrics::{score, MetricsSnapshot};
pub use plan::{AgentOutputs, Decision, Plan, ResolvedConflict, RoleKind, RoleOutput, Stance};
pub use scaffold::{Scaffold, ScaffoldState};
pub use vow::{Vow, VowRule};

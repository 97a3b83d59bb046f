//! # crucible-genesis
//!
//! Bounded three-pass refinement of a catalyst:
//!
//! 1. a concrete functional solution
//! 2. a critique of pass 1, taking its output as input, naming at least one
//!    hidden assumption
//! 3. a generalization in which the concrete terms are replaced by class
//!    placeholders
//!
//! Every pass runs the synthesizer and writes one heuristic.

#![deny(unsafe_code)]

mod engine;
mod error;

pub use engine::{
    hidden_assumptions, GenesisEngine, GenesisReport, GenesisTrigger, PassReport,
    COMPONENT_PLACEHOLDER, DEPENDENCY_PLACEHOLDER, DOMAIN_PLACEHOLDER, PASSES,
};
pub use error::{GenesisError, GenesisResult};

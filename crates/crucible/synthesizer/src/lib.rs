//! # crucible-synthesizer
//!
//! Four roles evaluate a problem in isolation:
//!
//! - **Innovator** proposes a thesis, folding in relevant heuristics and
//!   remedies for objections raised against the previous attempt
//! - **Falsifier** looks for defects and produces an antithesis, or approves
//! - **Narrator** checks the thesis/antithesis pair for coherence
//! - **Provocateur** claims one question whose token-set similarity to every
//!   prior question is below the novelty threshold
//!
//! The merge identifies at least one conflict between two roles, resolves
//! the primary one and scores the plan as a weighted sum of role agreement.
//! A plan below the confidence threshold is re-evaluated up to
//! `max_retries` times before its decision is recorded as not accepted.

#![deny(unsafe_code)]

pub mod config;
mod error;
pub mod merge;
mod novelty;
mod problem;
pub mod roles;
mod synthesizer;

pub use config::SynthesisConfig;
pub use error::{SynthesisError, SynthesisResult};
pub use novelty::{candidates, Claimed, QuestionHistory};
pub use problem::Problem;
pub use roles::{Evaluate, Evaluator};
pub use synthesizer::{Deliberation, ProvocationRecord, Synthesis, Synthesizer};

//! # crucible-foundry
//!
//! Turns an accepted decision into signed artifacts. Every draft is linted
//! and checked against active vows before anything is hashed; a single
//! failure publishes nothing and is recorded as `ValidationFailed`.
//!
//! Published artifacts carry a BLAKE3 digest of their content, an ed25519
//! signature over that digest, and a provenance manifest that links back to
//! the decision, plan and catalyst.

#![deny(unsafe_code)]

mod build;
mod config;
mod error;
mod foundry;
mod keys;
mod lint;

pub use build::{build, kinds_for, BuildInput};
pub use config::FoundryConfig;
pub use error::{FoundryError, FoundryResult};
pub use foundry::{hash, verify_artifact, CompileRequest, Draft, Foundry};
pub use keys::{verify_signature, SystemKey};
pub use lint::{lint, vow_findings, LintFinding, LintRule};

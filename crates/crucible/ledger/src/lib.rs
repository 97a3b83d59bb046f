//! # crucible-ledger
//!
//! The tamper-evident spine of crucible. Every component writes through
//! [`Ledger::commit`]; each entry is chained as
//! `H(prev_hash || seq || op_kind || payload_digest)` so that recomputing from
//! entry 0 must reproduce every stored hash.
//!
//! Besides [`Ledger::verify_chain`] the ledger retains each entry's canonical
//! payload, which lets [`Ledger::audit_payloads`] re-derive payload digests and
//! [`Ledger::lineage`] reconstruct the Catalyst -> Plan -> Decision -> Artifact
//! chain for audit.

#![deny(unsafe_code)]

mod error;
pub mod events;
mod ledger;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{ChainReport, Ledger, Lineage, DEFAULT_MAX_COMMIT_RETRIES};

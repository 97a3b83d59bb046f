//! # crucible-vows
//!
//! Vow Registry (CLA). A vow is a declared constraint compiled into a
//! [`crucible_types::VowRule`]; the foundry consults active vows before every
//! compilation and fails closed on a violation. Liberation is gated on
//! `min_cycles` and a non-empty justification recorded verbatim in the
//! ledger.

#![deny(unsafe_code)]

mod error;
mod registry;

pub use error::{VowError, VowResult};
pub use registry::{VowRegistry, VowStatus, VowViolation};

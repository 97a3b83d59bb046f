//! # crucible-scaffold
//!
//! Time-bounded constraints. A scaffold lives ACTIVE until its TTL runs out
//! (DISSOLVE) or it contradicts another active scaffold (SOLIDIFY, raising
//! an internal catalyst). Both paths end in ARCHIVE; no state is revisited.

#![deny(unsafe_code)]

pub mod config;
mod error;
mod manager;

pub use config::ScaffoldConfig;
pub use error::{ScaffoldError, ScaffoldResult};
pub use manager::{stability_ratio, PassReport, ScaffoldManager, Transition};

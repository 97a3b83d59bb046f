//! Crucible storage abstractions.
//!
//! - append-only ledger records ([`LedgerStore`])
//! - keyed JSON collections for catalysts, plans, decisions, artifacts,
//!   metrics snapshots, vows, scaffolds, heuristics and kernel state
//!   ([`RecordStore`])
//! - a derived lineage view over ledger + decisions + artifacts
//!
//! [`InMemoryStore`] backs tests and scratch runs; [`SqliteStore`] is the
//! durable local backend.

#![deny(unsafe_code)]

mod error;
pub mod memory;
mod model;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use model::{Collection, LineageRow};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use traits::{CrucibleStore, LedgerStore, RecordStore, RecordStoreExt};

//! Shared fixtures for the cross-crate suites under `tests/`.

use chrono::{DateTime, TimeZone, Utc};
use crucible_kernel::{Crucible, CrucibleConfig, Orchestrator};
use crucible_scanner::{SignalRecord, StaticSignals, TelemetryScanner};
use crucible_store::{CrucibleStore, InMemoryStore};
use crucible_types::StreamId;
use std::sync::Arc;

/// Fixed instant `secs` after 2026-01-01T00:00:00Z.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600 + secs, 0)
        .single()
        .unwrap_or_default()
}

pub fn signal(severity: f64, domain: &str, secs: i64, evidence: &str) -> SignalRecord {
    SignalRecord::new(severity, domain, at(secs), evidence)
}

/// A small incident feed with one clear winner.
pub fn incident_signals() -> Vec<SignalRecord> {
    vec![
        signal(0.45, "search", 30, "query latency drifts upward after the index rebuild"),
        signal(0.85, "checkout", 10, "checkout retries saturate the payment gateway pool"),
        signal(0.6, "inventory", 20, "stock reservations expire before fulfilment confirms"),
    ]
}

/// Demo configuration whose Stop Rule fires on the first completed cycle.
pub fn halting_config() -> CrucibleConfig {
    let mut config = CrucibleConfig::demo();
    config.stop_rule.trend_window = 1;
    config.stop_rule.novelty_target = 0.0;
    config.stop_rule.fidelity_target = 0.0;
    config.stop_rule.novelty_event_min = 0.0;
    config
}

/// A crucible over a fresh in-memory store fed by `records`. The store
/// handle is returned so suites can tamper with it.
pub async fn crucible_with(
    config: CrucibleConfig,
    records: Vec<SignalRecord>,
) -> (Arc<InMemoryStore>, Arc<Crucible>) {
    let store = Arc::new(InMemoryStore::new());
    let scanner = TelemetryScanner::new().with_source(StaticSignals::new(records));
    let crucible = Crucible::with_store(store.clone() as Arc<dyn CrucibleStore>, config, scanner)
        .await
        .unwrap_or_else(|e| panic!("crucible fixture failed to open: {e}"));
    (store, crucible)
}

/// Orchestrator for the primary stream over [`crucible_with`].
pub async fn primary(
    config: CrucibleConfig,
    records: Vec<SignalRecord>,
) -> (Arc<InMemoryStore>, Orchestrator) {
    let (store, crucible) = crucible_with(config, records).await;
    (store, Orchestrator::new(crucible, StreamId::primary()))
}

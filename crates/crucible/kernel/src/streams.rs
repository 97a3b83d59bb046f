//! Independent catalyst streams over one shared crucible.

use crate::error::{KernelError, KernelResult};
use crate::orchestrator::{CycleOutcome, Orchestrator};
use crate::runtime::Crucible;
use crucible_types::{ContentHash, Cycle, ErrorClass, StreamId};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamPlan {
    pub streams: usize,
    /// Cycles each stream attempts before stopping.
    pub cycles: u64,
    pub time_critical: bool,
}

/// How one stream's run ended.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamReport {
    pub stream: StreamId,
    pub completed: u64,
    /// Cycles lost to novelty violations.
    pub aborted: u64,
    pub last_cycle: Cycle,
    pub halted: Option<ContentHash>,
    pub stopped_by: Option<ErrorClass>,
    pub error: Option<String>,
}

pub fn stream_id(index: usize) -> StreamId {
    StreamId::new(format!("stream-{index}"))
}

async fn drive(orchestrator: Orchestrator, cycles: u64, time_critical: bool) -> StreamReport {
    let mut report = StreamReport {
        stream: orchestrator.stream().clone(),
        completed: 0,
        aborted: 0,
        last_cycle: 0,
        halted: None,
        stopped_by: None,
        error: None,
    };
    for _ in 0..cycles {
        match orchestrator.run_cycle(time_critical).await {
            Ok(CycleOutcome::Completed(cycle)) => {
                report.completed += 1;
                report.last_cycle = cycle.cycle;
                if let Some(pack) = &cycle.integrate.evidence {
                    report.halted = Some(pack.digest.clone());
                    break;
                }
            }
            Ok(CycleOutcome::Halted(pack)) => {
                report.halted = Some(pack.digest);
                break;
            }
            Err(e) if e.class() == ErrorClass::NoveltyViolation => {
                warn!(stream = %report.stream, error = %e, "cycle aborted; continuing");
                report.aborted += 1;
            }
            Err(e) => {
                warn!(stream = %report.stream, error = %e, "stream stopped");
                report.stopped_by = Some(e.class());
                report.error = Some(e.to_string());
                break;
            }
        }
    }
    report
}

/// Run `plan.streams` orchestrators concurrently, each as its own task.
///
/// Streams share the ledger, the heuristic store and the internal catalyst
/// queue; each owns its cursor.
pub async fn run_streams(crucible: Arc<Crucible>, plan: &StreamPlan) -> KernelResult<Vec<StreamReport>> {
    info!(streams = plan.streams, cycles = plan.cycles, "starting catalyst streams");
    let handles: Vec<_> = (0..plan.streams)
        .map(|i| {
            let orchestrator = Orchestrator::new(crucible.clone(), stream_id(i));
            tokio::spawn(drive(orchestrator, plan.cycles, plan.time_critical))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        reports.push(joined.map_err(|e| KernelError::Worker(e.to_string()))?);
    }
    info!(
        completed = reports.iter().map(|r| r.completed).sum::<u64>(),
        halted = reports.iter().filter(|r| r.halted.is_some()).count(),
        "catalyst streams finished"
    );
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrucibleConfig;
    use chrono::{TimeZone, Utc};
    use crucible_scanner::{SignalRecord, StaticSignals, TelemetryScanner};
    use crucible_store::InMemoryStore;
    use crucible_types::OpKind;

    async fn crucible() -> Arc<Crucible> {
        let records = vec![
            SignalRecord::new(0.7, "storage", Utc.timestamp_opt(5, 0).unwrap(), "disk latency climbs during compaction"),
            SignalRecord::new(0.5, "network", Utc.timestamp_opt(9, 0).unwrap(), "packet loss on the east gateway"),
        ];
        Crucible::with_store(
            Arc::new(InMemoryStore::new()),
            CrucibleConfig::demo(),
            TelemetryScanner::new().with_source(StaticSignals::new(records)),
        )
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_streams_keep_the_chain_intact() {
        let crucible = crucible().await;
        let plan = StreamPlan {
            streams: 3,
            cycles: 2,
            time_critical: true,
        };
        let reports = run_streams(crucible.clone(), &plan).await.unwrap();
        assert_eq!(reports.len(), 3);
        let ids: Vec<_> = reports.iter().map(|r| r.stream.to_string()).collect();
        assert_eq!(ids, vec!["stream-0", "stream-1", "stream-2"]);

        let report = crucible.ledger.verify_chain().await.unwrap();
        assert_eq!(report.entries, crucible.ledger.len().await.unwrap());

        let completed: u64 = reports.iter().map(|r| r.completed).sum();
        let records = crucible.ledger.records_of(OpKind::CycleCompleted).await.unwrap();
        assert_eq!(records.len() as u64, completed);
    }

    #[tokio::test]
    async fn zero_streams_is_empty() {
        let plan = StreamPlan {
            streams: 0,
            cycles: 3,
            time_critical: false,
        };
        assert!(run_streams(crucible().await, &plan).await.unwrap().is_empty());
    }
}

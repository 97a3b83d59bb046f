//! End-to-end test: several catalyst streams share one ledger, one
//! heuristic store and one internal catalyst queue.

use crucible_kernel::{pending, run_streams, stream_id, CrucibleConfig, Orchestrator, StreamPlan};
use crucible_tests::{crucible_with, incident_signals};
use crucible_types::{OpKind, ScaffoldState};
use std::collections::HashSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn streams_interleave_without_breaking_the_chain() {
    let (_, crucible) = crucible_with(CrucibleConfig::demo(), incident_signals()).await;
    let plan = StreamPlan {
        streams: 4,
        cycles: 2,
        time_critical: true,
    };
    let reports = run_streams(crucible.clone(), &plan).await.unwrap();
    assert_eq!(reports.len(), 4);
    for report in &reports {
        assert!(report.stopped_by.is_none(), "{:?}", report.error);
    }

    let ledger = &crucible.ledger;
    let chain = ledger.verify_chain().await.unwrap();
    assert_eq!(chain.entries, ledger.len().await.unwrap());

    let completed = ledger.records_of(OpKind::CycleCompleted).await.unwrap();
    let total: u64 = reports.iter().map(|r| r.completed).sum();
    assert_eq!(completed.len() as u64, total);
    let streams: HashSet<String> = completed
        .iter()
        .filter_map(|r| r.payload["stream"].as_str().map(str::to_string))
        .collect();
    assert!(streams.len() > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn an_internal_catalyst_is_claimed_once() {
    let (_, crucible) = crucible_with(CrucibleConfig::demo(), incident_signals()).await;
    let seed = Orchestrator::new(crucible.clone(), stream_id(0));
    seed.declare_scaffold("always batch ledger writes", Some(8)).await.unwrap();
    seed.declare_scaffold("never batch ledger writes", Some(8)).await.unwrap();
    seed.run_cycle(true).await.unwrap();
    assert_eq!(pending(&crucible.ledger).await.unwrap().len(), 1);

    let plan = StreamPlan {
        streams: 3,
        cycles: 1,
        time_critical: true,
    };
    run_streams(crucible.clone(), &plan).await.unwrap();

    let selected = crucible.ledger.records_of(OpKind::CatalystSelected).await.unwrap();
    let internal: Vec<_> = selected
        .iter()
        .filter(|r| r.payload["internal"].as_bool() == Some(true))
        .collect();
    assert_eq!(internal.len(), 1);
    assert!(pending(&crucible.ledger).await.unwrap().is_empty());
    assert!(crucible
        .scaffolds
        .all()
        .unwrap()
        .iter()
        .all(|s| s.state == ScaffoldState::Archive));
}

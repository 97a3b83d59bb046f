//! End-to-end test: the Stop Rule halts a stream with a signed evidence
//! pack, and a halted stream stays halted.

use crucible_kernel::{CycleOutcome, CycleState, KernelError};
use crucible_tests::{halting_config, incident_signals, primary};
use crucible_types::OpKind;

#[tokio::test]
async fn stop_rule_seals_a_verifiable_pack() {
    let (_, orch) = primary(halting_config(), incident_signals()).await;
    let CycleOutcome::Completed(report) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert!(report.halted(), "unmet: {:?}", report.integrate.evaluation.unmet());

    let pack = report.integrate.evidence.clone().unwrap();
    assert!(pack.verify());
    assert!(pack.body.chain_verified);
    assert_eq!(pack.body.cycle, 1);
    assert_eq!(pack.public_key, orch.crucible().foundry.public_key_hex());
    let mut published: Vec<_> = report
        .execute
        .iter()
        .flat_map(|e| e.artifacts.iter().map(|a| a.id.clone()))
        .collect();
    let mut sealed = pack.body.artifact_ids.clone();
    published.sort();
    sealed.sort();
    assert_eq!(sealed, published);

    let cursor = orch.cursor().await.unwrap();
    assert_eq!(cursor.state, CycleState::Halted);
    assert!(!cursor.audit_required);
    assert_eq!(cursor.evidence_digest, Some(pack.digest.clone()));

    let ledger = &orch.crucible().ledger;
    let halted = ledger.records_of(OpKind::Halted).await.unwrap();
    assert_eq!(halted.len(), 1);
    assert_eq!(halted[0].payload["evidence_digest"], serde_json::json!(pack.digest));
}

#[tokio::test]
async fn halted_streams_refuse_steps_but_report_evidence() {
    let (_, orch) = primary(halting_config(), incident_signals()).await;
    orch.run_cycle(false).await.unwrap();
    let stored = orch.evidence().await.unwrap().unwrap();

    assert!(matches!(orch.scan().await.unwrap_err(), KernelError::Halted { .. }));
    assert!(matches!(orch.integrate().await.unwrap_err(), KernelError::Halted { .. }));

    let entries = orch.crucible().ledger.len().await.unwrap();
    for _ in 0..2 {
        let CycleOutcome::Halted(pack) = orch.run_cycle(false).await.unwrap() else {
            panic!("expected the stored pack");
        };
        assert_eq!(*pack, stored);
    }
    assert_eq!(orch.crucible().ledger.len().await.unwrap(), entries);
}

#[tokio::test]
async fn short_history_never_halts() {
    // The acceptance trend needs a full window of snapshots.
    let mut config = halting_config();
    config.stop_rule.trend_window = 5;
    let (_, orch) = primary(config, incident_signals()).await;

    let CycleOutcome::Completed(report) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert!(!report.halted());
    assert!(!report.integrate.evaluation.trend_non_decreasing);
    assert_eq!(report.integrate.evaluation.unmet(), vec!["acceptance trend"]);
    assert!(orch.evidence().await.unwrap().is_none());
}

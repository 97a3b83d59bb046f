//! Adversarial test: out-of-band edits to stored ledger entries are caught,
//! and an integrity failure halts the stream until an audit clears it.

use crucible_kernel::{CrucibleConfig, CycleOutcome, CycleState, KernelError};
use crucible_ledger::LedgerError;
use crucible_tests::{incident_signals, primary};
use crucible_types::{ContentHash, ErrorClass, OpKind};

#[tokio::test]
async fn rewritten_payloads_fail_the_audit() {
    let (store, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let CycleOutcome::Completed(_) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    let ledger = &orch.crucible().ledger;
    let decision = ledger.records_of(OpKind::DecisionRecorded).await.unwrap()[0].entry.seq;

    store
        .tamper_with(decision, |record| {
            let accepted = record.payload["accepted"].as_bool().unwrap_or(false);
            record.payload["accepted"] = serde_json::json!(!accepted);
        })
        .unwrap();

    // Headers still link; only the payload audit sees the edit.
    ledger.verify_chain().await.unwrap();
    match ledger.audit_payloads().await {
        Err(LedgerError::PayloadMismatch { seq }) => assert_eq!(seq, decision),
        other => panic!("expected a payload mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn broken_chain_halts_until_audit() {
    let (store, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    orch.run_cycle(false).await.unwrap();
    let ledger = &orch.crucible().ledger;

    let victim = 2;
    let original = ledger.records().await.unwrap()[victim as usize].clone();
    store
        .tamper_with(victim, |record| record.entry.hash = ContentHash::hash(b"forged"))
        .unwrap();

    let err = orch.scan().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::IntegrityError);
    assert_eq!(err.exit_code(), 15);

    let cursor = orch.cursor().await.unwrap();
    assert_eq!(cursor.state, CycleState::Halted);
    assert!(cursor.audit_required);
    assert!(matches!(orch.scan().await.unwrap_err(), KernelError::AuditRequired(_)));
    assert!(matches!(
        orch.run_cycle(false).await.unwrap_err(),
        KernelError::AuditRequired(_)
    ));

    let halts = ledger.records_of(OpKind::Halted).await.unwrap();
    assert_eq!(halts.len(), 1);
    assert_eq!(halts[0].payload["audit_required"], serde_json::json!(true));

    // The auditor cannot clear a chain that still fails.
    let err = orch.resume_after_audit("looks fine").await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::IntegrityError);
    assert!(orch.cursor().await.unwrap().audit_required);

    store.tamper_with(victim, |record| *record = original).unwrap();
    let clearance = orch.resume_after_audit("restored entry 2 from backup").await.unwrap();
    assert_eq!(clearance.chain.entries, ledger.len().await.unwrap() - 1);
    assert_eq!(ledger.records_of(OpKind::AuditCleared).await.unwrap().len(), 1);

    let cursor = orch.cursor().await.unwrap();
    assert_eq!(cursor.state, CycleState::Scan);
    assert!(!cursor.audit_required);
    orch.scan().await.unwrap();
}

#[tokio::test]
async fn clearing_a_healthy_stream_is_refused() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let err = orch.resume_after_audit("nothing to clear").await.unwrap_err();
    assert!(matches!(err, KernelError::WrongState { .. }));
    assert!(orch
        .crucible()
        .ledger
        .records_of(OpKind::AuditCleared)
        .await
        .unwrap()
        .is_empty());
}

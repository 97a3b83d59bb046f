//! End-to-end test: a forbidding vow blocks publication until it is
//! liberated, and a requiring vow is honoured by every artifact.

use crucible_kernel::{CrucibleConfig, CycleOutcome};
use crucible_store::{Collection, RecordStoreExt};
use crucible_tests::{incident_signals, primary};
use crucible_types::{Artifact, ErrorClass, OpKind};

#[tokio::test]
async fn forbidding_vow_blocks_then_liberation_unblocks() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    // Every draft title names the catalyst's domain.
    let vow = orch.declare_vow("never checkout", 1).await.unwrap();

    let CycleOutcome::Completed(blocked) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert!(blocked.validation_failure.is_some());
    assert!(blocked.execute.is_none());
    assert_eq!(blocked.integrate.adherence.get(&vow.id), Some(&false));

    let ledger = &orch.crucible().ledger;
    assert_eq!(ledger.records_of(OpKind::ValidationFailed).await.unwrap().len(), 1);
    assert!(ledger.records_of(OpKind::ArtifactPublished).await.unwrap().is_empty());

    let empty = orch.liberate_vow(&vow.id, "   ").await.unwrap_err();
    assert_eq!(empty.class(), ErrorClass::ValidationError);
    let liberated = orch
        .liberate_vow(&vow.id, "checkout naming moved to the gateway team")
        .await
        .unwrap();
    assert!(liberated.liberated);
    assert_eq!(liberated.liberated_at_cycle, Some(1));

    let CycleOutcome::Completed(open) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert!(open.validation_failure.is_none());
    assert!(!open.execute.unwrap().artifacts.is_empty());
    assert!(!open.integrate.adherence.contains_key(&vow.id));

    let evaluation = orch.stop_rule_check().await.unwrap();
    assert!(evaluation.liberation_event);
}

#[tokio::test]
async fn liberation_waits_for_min_cycles() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let vow = orch.declare_vow("avoid global locks", 3).await.unwrap();
    orch.run_cycle(true).await.unwrap();

    let err = orch
        .liberate_vow(&vow.id, "lock scope was narrowed")
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 13);

    let status = orch.vow_status().await.unwrap();
    assert_eq!(status.len(), 1);
    assert!(!status[0].eligible_for_liberation);
    assert_eq!(status[0].cycles_until_eligible, 2);
    assert_eq!(status[0].adherence_ratio, 1.0);
}

#[tokio::test]
async fn requiring_vow_is_carried_into_artifacts() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    orch.declare_vow("always cite incident evidence", 2).await.unwrap();
    let CycleOutcome::Completed(report) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert!(report.validation_failure.is_none(), "{:?}", report.validation_failure);

    let stored: Vec<Artifact> = orch
        .crucible()
        .ledger
        .store()
        .list_json(Collection::Artifacts)
        .await
        .unwrap();
    assert!(!stored.is_empty());
    assert!(stored
        .iter()
        .all(|a| a.content.to_lowercase().contains("cite incident evidence")));
}

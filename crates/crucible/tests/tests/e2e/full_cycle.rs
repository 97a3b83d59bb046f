//! End-to-end test: one catalyst through SCAN, ARCHITECT, EXECUTE and
//! INTEGRATE, then traced back from every artifact it produced.

use crucible_foundry::verify_artifact;
use crucible_kernel::{CrucibleConfig, CycleOutcome, CycleState};
use crucible_store::{Collection, RecordStoreExt};
use crucible_tests::{incident_signals, primary};
use crucible_types::{Artifact, ArtifactKind, OpKind};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_artifact_traces_back_to_its_catalyst() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let CycleOutcome::Completed(report) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };

    let scan = report.scan.clone().unwrap();
    assert_eq!(scan.catalyst.domain_tag, "checkout");
    let architect = report.architect.clone().unwrap();
    let execute = report.execute.clone().expect("nothing blocks publication");
    assert!(!execute.artifacts.is_empty());

    for artifact in &execute.artifacts {
        let lineage = orch.lineage(artifact.id.as_str()).await.unwrap();
        assert_eq!(lineage.artifact.digest, artifact.digest);
        assert_eq!(lineage.decision.decision_id, architect.decision_id);
        assert_eq!(lineage.plan.plan_id, architect.plan_id);
        assert_eq!(lineage.catalyst.catalyst_id, scan.catalyst.id);
        let [artifact_seq, decision_seq, plan_seq, catalyst_seq] = lineage.seqs;
        assert!(artifact_seq > decision_seq);
        assert!(decision_seq > plan_seq);
        assert!(plan_seq > catalyst_seq);
    }
}

#[tokio::test]
async fn accepted_decisions_publish_the_full_set() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let CycleOutcome::Completed(report) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    let architect = report.architect.clone().unwrap();
    let kinds: Vec<ArtifactKind> = report
        .execute
        .as_ref()
        .unwrap()
        .artifacts
        .iter()
        .map(|a| a.kind)
        .collect();

    assert!(kinds.contains(&ArtifactKind::Report));
    if architect.accepted {
        assert!(kinds.contains(&ArtifactKind::Spec));
        assert!(kinds.contains(&ArtifactKind::Code));
        assert!(kinds.contains(&ArtifactKind::Test));
    } else {
        assert_eq!(kinds, vec![ArtifactKind::Report]);
    }
}

#[tokio::test]
async fn published_artifacts_verify_and_the_chain_holds() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    for _ in 0..3 {
        match orch.run_cycle(true).await {
            Ok(_) => {}
            // A feed this small can run out of novel questions.
            Err(e) if e.class() == crucible_types::ErrorClass::NoveltyViolation => {}
            Err(e) => panic!("cycle failed: {e}"),
        }
    }

    let ledger = &orch.crucible().ledger;
    let chain = ledger.verify_chain().await.unwrap();
    assert_eq!(chain.entries, ledger.len().await.unwrap());
    assert_eq!(ledger.audit_payloads().await.unwrap(), chain.entries);

    let stored: Vec<Artifact> = ledger.store().list_json(Collection::Artifacts).await.unwrap();
    assert!(!stored.is_empty());
    assert!(stored.iter().all(verify_artifact));
    assert!(stored.iter().all(|a| a.kind != ArtifactKind::Test));

    let completed = ledger.records_of(OpKind::CycleCompleted).await.unwrap();
    let published = ledger.records_of(OpKind::ArtifactPublished).await.unwrap();
    assert!(!completed.is_empty());
    let last_publish = published.iter().map(|r| r.entry.seq).max().unwrap();
    let last_complete = completed.iter().map(|r| r.entry.seq).max().unwrap();
    assert!(last_complete > last_publish);

    let cursor = orch.cursor().await.unwrap();
    assert!(matches!(cursor.state, CycleState::Scan | CycleState::Halted));
}

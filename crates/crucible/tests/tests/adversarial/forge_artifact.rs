//! Adversarial test: forged artifacts and evidence packs fail verification,
//! and a published artifact cannot be replaced.

use crucible_foundry::{hash, verify_artifact, SystemKey};
use crucible_kernel::{CrucibleConfig, CycleOutcome};
use crucible_metrics::EvidencePack;
use crucible_store::{Collection, RecordStoreExt};
use crucible_tests::{halting_config, incident_signals, primary};
use crucible_types::{Artifact, ArtifactKind};

async fn published() -> (crucible_kernel::Orchestrator, Vec<Artifact>) {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let CycleOutcome::Completed(report) = orch.run_cycle(false).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    let store = orch.crucible().ledger.store().clone();
    let mut artifacts = Vec::new();
    for summary in report.execute.clone().unwrap().artifacts {
        let artifact: Artifact = store
            .require_json(Collection::Artifacts, summary.id.as_str())
            .await
            .unwrap();
        assert_eq!(artifact.digest, summary.digest);
        artifacts.push(artifact);
    }
    assert!(artifacts.iter().all(verify_artifact));
    (orch, artifacts)
}

#[tokio::test]
async fn edited_content_is_detected() {
    let (_, artifacts) = published().await;
    let mut forged = artifacts[0].clone();
    forged.content.push_str("\n// backdoor\n");
    assert!(!verify_artifact(&forged));

    // Re-hashing the edit does not help without the system key.
    forged.digest = hash(&forged.content);
    assert!(forged.verify_digest());
    assert!(!verify_artifact(&forged));
}

#[tokio::test]
async fn signatures_do_not_transfer() {
    let (orch, artifacts) = published().await;
    let report = artifacts
        .iter()
        .find(|a| a.kind == ArtifactKind::Report)
        .unwrap();

    let mut forged = report.clone();
    forged.signature = "00".repeat(64);
    assert!(!verify_artifact(&forged));

    if let Some(other) = artifacts.iter().find(|a| a.digest != report.digest) {
        let mut swapped = report.clone();
        swapped.signature = other.signature.clone();
        assert!(!verify_artifact(&swapped));
    }

    // A self-consistent forgery still names the wrong key.
    let attacker = SystemKey::generate();
    let mut resigned = report.clone();
    resigned.signature = attacker.sign(&resigned.digest);
    assert!(!verify_artifact(&resigned));
    resigned.public_key = attacker.public_key_hex();
    assert!(verify_artifact(&resigned));
    assert_ne!(resigned.public_key, orch.crucible().foundry.public_key_hex());
}

#[tokio::test]
async fn published_artifacts_cannot_be_replaced() {
    let (orch, artifacts) = published().await;
    let original = artifacts[0].clone();
    let mut forged = original.clone();
    forged.content = "## Outcome\nnothing happened\n".into();
    forged.digest = hash(&forged.content);
    forged.signature = orch.crucible().foundry.key().sign(&forged.digest);

    assert!(orch.crucible().foundry.publish(&forged).await.is_err());
    let stored: Option<Artifact> = orch
        .crucible()
        .ledger
        .store()
        .get_json(Collection::Artifacts, original.id.as_str())
        .await
        .unwrap();
    assert_eq!(stored, Some(original));
}

#[tokio::test]
async fn tampered_evidence_packs_fail_verification() {
    let (_, orch) = primary(halting_config(), incident_signals()).await;
    orch.run_cycle(false).await.unwrap();
    let pack: EvidencePack = orch.evidence().await.unwrap().unwrap();
    assert!(pack.verify());

    let mut padded = pack.clone();
    padded.body.chain_entries += 1;
    assert!(!padded.verify_hash());
    assert!(!padded.verify());

    let mut hidden = pack.clone();
    hidden.body.artifact_ids.clear();
    assert!(!hidden.verify());

    let attacker = SystemKey::generate();
    let resealed = EvidencePack::seal(hidden.body.clone(), &attacker).unwrap();
    assert!(resealed.verify());
    assert_ne!(resealed.public_key, pack.public_key);

    let mut grafted = resealed;
    grafted.public_key = pack.public_key.clone();
    assert!(!grafted.verify());
}

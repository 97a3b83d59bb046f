//! End-to-end test: contradicting scaffolds solidify and feed an internal
//! catalyst back into the next SCAN, which outranks external telemetry.

use crucible_kernel::{pending, CrucibleConfig, CycleOutcome};
use crucible_tests::{incident_signals, primary};
use crucible_types::{CatalystOrigin, ScaffoldState};

#[tokio::test]
async fn contradiction_becomes_the_next_catalyst() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let a = orch.declare_scaffold("always cache session tokens", Some(6)).await.unwrap();
    let b = orch.declare_scaffold("never cache session tokens", Some(6)).await.unwrap();

    let CycleOutcome::Completed(first) = orch.run_cycle(true).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert_eq!(first.scan.as_ref().unwrap().catalyst.domain_tag, "checkout");
    assert_eq!(first.integrate.raised.len(), 1);

    let scaffolds = &orch.crucible().scaffolds;
    assert_eq!(scaffolds.get(&a.id).unwrap().state, ScaffoldState::Solidify);
    assert_eq!(scaffolds.get(&b.id).unwrap().state, ScaffoldState::Solidify);
    let queued = pending(&orch.crucible().ledger).await.unwrap();
    assert_eq!(queued.len(), 1);

    let CycleOutcome::Completed(second) = orch.run_cycle(true).await.unwrap() else {
        panic!("expected a completed cycle");
    };
    let catalyst = &second.scan.as_ref().unwrap().catalyst;
    assert_eq!(catalyst.id, first.integrate.raised[0]);
    assert!(matches!(
        catalyst.origin,
        CatalystOrigin::ScaffoldContradiction { .. }
    ));
    assert!(pending(&orch.crucible().ledger).await.unwrap().is_empty());

    // Consumed by a completed cycle, both solidified scaffolds archive.
    assert_eq!(scaffolds.get(&a.id).unwrap().state, ScaffoldState::Archive);
    assert_eq!(scaffolds.get(&b.id).unwrap().state, ScaffoldState::Archive);
}

#[tokio::test]
async fn expired_scaffolds_dissolve_then_archive() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    let s = orch.declare_scaffold("prefer read replicas", Some(1)).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        orch.run_cycle(true).await.unwrap();
        seen.push(orch.crucible().scaffolds.get(&s.id).unwrap().state);
    }
    assert!(seen.contains(&ScaffoldState::Dissolve));
    assert_eq!(seen.last(), Some(&ScaffoldState::Archive));
}

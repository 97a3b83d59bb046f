//! End-to-end test: each step runs against a freshly reopened SQLite store,
//! the way separate CLI invocations drive a cycle.

use crucible_kernel::{Crucible, CrucibleConfig, CycleState, Orchestrator, StoreConfig};
use crucible_types::{OpKind, StreamId};
use std::path::Path;
use std::sync::Arc;

fn config(root: &Path) -> CrucibleConfig {
    let signals = root.join("signals");
    std::fs::create_dir_all(&signals).unwrap();
    std::fs::write(
        signals.join("feed.jsonl"),
        concat!(
            r#"{"severity": 0.7, "domain": "storage", "timestamp": "2026-02-01T00:00:00Z", "evidence": "compaction stalls block writers"}"#,
            "\n",
            r#"{"severity": 0.2, "domain": "docs", "timestamp": "2026-02-02T00:00:00Z", "evidence": "stale runbook link"}"#,
            "\n",
        ),
    )
    .unwrap();
    let mut config = CrucibleConfig::demo();
    config.store = StoreConfig::Sqlite {
        path: root.join("db").join("crucible.db"),
    };
    config.telemetry.dir = Some(signals);
    config
}

async fn reopen(config: &CrucibleConfig) -> (Arc<Crucible>, Orchestrator) {
    let crucible = Crucible::open(config.clone()).await.unwrap();
    let orch = Orchestrator::new(crucible.clone(), StreamId::primary());
    (crucible, orch)
}

#[tokio::test]
async fn cursor_survives_process_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    let (first, orch) = reopen(&config).await;
    let key = first.foundry.public_key_hex();
    let scan = orch.scan().await.unwrap();
    assert_eq!(scan.catalyst.domain_tag, "storage");
    drop((first, orch));

    let (_, orch) = reopen(&config).await;
    let cursor = orch.cursor().await.unwrap();
    assert_eq!(cursor.state, CycleState::Architect);
    assert_eq!(cursor.catalyst.as_ref().map(|c| &c.id), Some(&scan.catalyst.id));
    let architect = orch.architect().await.unwrap();
    drop(orch);

    let (crucible, orch) = reopen(&config).await;
    assert!(!crucible.synthesizer.history().is_empty());
    assert_eq!(crucible.foundry.public_key_hex(), key);
    let execute = orch.execute(false).await.unwrap();
    assert!(!execute.artifacts.is_empty());
    drop((crucible, orch));

    let (crucible, orch) = reopen(&config).await;
    let integrate = orch.integrate().await.unwrap();
    assert_eq!(integrate.cycle, 1);
    let cursor = orch.cursor().await.unwrap();
    assert_eq!(cursor.state, CycleState::Scan);
    assert_eq!(cursor.cycle, 1);

    let ledger = &crucible.ledger;
    ledger.verify_chain().await.unwrap();
    let lineage = orch
        .lineage(execute.artifacts[0].id.as_str())
        .await
        .unwrap();
    assert_eq!(lineage.decision.decision_id, architect.decision_id);
    assert_eq!(ledger.records_of(OpKind::CycleCompleted).await.unwrap().len(), 1);
}

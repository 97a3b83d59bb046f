//! Property tests: digests and metric snapshots are pure functions of their
//! inputs, so recomputing them always reproduces the same bits.

use crucible_foundry::hash;
use crucible_ledger::events::{DecisionRecorded, PlanProposed};
use crucible_ledger::Ledger;
use crucible_metrics::{compute_snapshot, LedgerFacts, MetricsEngine, StopRuleConfig};
use crucible_store::InMemoryStore;
use crucible_types::{CatalystId, ContentHash, DecisionId, OpKind, PlanId, StreamId};
use proptest::prelude::*;
use std::sync::Arc;

fn arb_facts() -> impl Strategy<Value = Vec<(u64, f64, f64, bool)>> {
    prop::collection::vec((1u64..6, 0.0f64..=1.0, 0.0f64..=1.0, any::<bool>()), 0..12)
}

async fn ledger_of(facts: &[(u64, f64, f64, bool)]) -> Arc<Ledger> {
    let ledger = Arc::new(Ledger::new(Arc::new(InMemoryStore::new())));
    for (i, (cycle, confidence, novelty, accepted)) in facts.iter().enumerate() {
        let plan_id = PlanId::new(format!("plan-{i}"));
        let catalyst_id = CatalystId::new(format!("cat-{i}"));
        let plan = PlanProposed {
            plan_id: plan_id.clone(),
            catalyst_id: catalyst_id.clone(),
            stream: StreamId::primary(),
            cycle: *cycle,
            confidence: *confidence,
            novelty: *novelty,
            attempt: 0,
            resolved_conflict: None,
        };
        ledger.commit(OpKind::PlanProposed, &plan).await.unwrap();
        let decision = DecisionRecorded {
            decision_id: DecisionId::new(format!("dec-{i}")),
            plan_id,
            catalyst_id,
            accepted: *accepted,
            threshold_used: 0.6,
            retries_consumed: 0,
        };
        ledger.commit(OpKind::DecisionRecorded, &decision).await.unwrap();
    }
    ledger
}

proptest! {
    #[test]
    fn content_hashes_are_stable(content in ".{0,256}", other in ".{0,256}") {
        let digest = hash(&content);
        prop_assert_eq!(&digest, &hash(&content));
        prop_assert_eq!(&ContentHash::from_hex(&digest.to_hex()).unwrap(), &digest);
        if content != other {
            prop_assert_ne!(digest, hash(&other));
        }
    }

    #[test]
    fn json_digests_ignore_key_insertion_order(a in any::<i64>(), b in "[a-z]{0,12}", c in any::<bool>()) {
        let mut forward = serde_json::Map::new();
        forward.insert("a".into(), a.into());
        forward.insert("b".into(), b.clone().into());
        forward.insert("c".into(), c.into());
        let mut backward = serde_json::Map::new();
        backward.insert("c".into(), c.into());
        backward.insert("b".into(), b.into());
        backward.insert("a".into(), a.into());
        prop_assert_eq!(
            ContentHash::of_json(&forward).unwrap(),
            ContentHash::of_json(&backward).unwrap()
        );
    }

    #[test]
    fn snapshots_recompute_bit_identically(facts in arb_facts(), cycle in 1u64..8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = ledger_of(&facts).await;
            let records = ledger.records().await.unwrap();
            let first = compute_snapshot(cycle, &LedgerFacts::from_records(&records), &[], &[]);
            let second = compute_snapshot(cycle, &LedgerFacts::from_records(&records), &[], &[]);
            assert!(first.bit_identical(&second));

            let engine = MetricsEngine::new(ledger, StopRuleConfig::default());
            let live = engine.snapshot(cycle, &[], &[]).await.unwrap();
            assert!(live.bit_identical(&first));
            for value in first.scores.values() {
                assert!(value.is_finite(), "non-finite score: {value}");
            }
        });
    }
}

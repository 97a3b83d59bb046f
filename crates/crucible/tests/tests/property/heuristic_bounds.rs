//! Property tests: heuristic confidence stays inside [0, 1] under any mix of
//! reinforcement and decay, and each operation moves it in one direction.

use crucible_heuristics::{HeuristicConfig, HeuristicStore};
use crucible_ledger::Ledger;
use crucible_store::InMemoryStore;
use crucible_types::HeuristicSource;
use proptest::prelude::*;
use std::sync::Arc;

const PRINCIPLES: [&str; 3] = [
    "cache warm shards before failover",
    "batch index writes per tenant",
    "pin toolchain versions in release builds",
];

#[derive(Clone, Debug)]
enum Op {
    Reinforce(usize),
    Decay(u64),
    Advance,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..PRINCIPLES.len()).prop_map(Op::Reinforce),
        3 => (0u64..8).prop_map(Op::Decay),
        1 => Just(Op::Advance),
    ]
}

fn arb_config() -> impl Strategy<Value = HeuristicConfig> {
    (0.0f64..=1.0, 0.0f64..=0.6, 0.0f64..=0.3).prop_map(|(initial, reinforce, decay)| {
        HeuristicConfig {
            initial_confidence: initial,
            reinforce_step: reinforce,
            decay_step: decay,
            // Keep synthesis out of the picture; nothing here conflicts.
            synthesis_floor: 0.0,
            ..HeuristicConfig::default()
        }
    })
}

proptest! {
    #[test]
    fn confidence_stays_in_unit_range(
        config in arb_config(),
        ops in prop::collection::vec(arb_op(), 1..40),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = Arc::new(Ledger::new(Arc::new(InMemoryStore::new())));
            let store = HeuristicStore::new(ledger, config);
            let mut ids = Vec::new();
            for principle in PRINCIPLES {
                let h = store.write(principle, 0, HeuristicSource::Decision).await.unwrap();
                ids.push(h.id);
            }

            let mut cycle = 1;
            for op in ops {
                match op {
                    Op::Reinforce(i) => {
                        let before = store.get(&ids[i]).unwrap().confidence;
                        let after = store.reinforce(&ids[i], cycle).await.unwrap();
                        assert!(after >= before, "reinforce lowered {before} to {after}");
                        assert!(after <= 1.0);
                    }
                    Op::Decay(idle) => {
                        let before: Vec<f64> =
                            ids.iter().map(|id| store.get(id).unwrap().confidence).collect();
                        let report = store.decay(cycle, idle).await.unwrap();
                        assert!(report.synthesized.is_empty());
                        for (id, b) in ids.iter().zip(before) {
                            let after = store.get(id).unwrap().confidence;
                            assert!(after <= b, "decay raised {b} to {after}");
                        }
                        for (_, b, a) in &report.decayed {
                            assert!(a < b);
                        }
                    }
                    Op::Advance => cycle += 1,
                }
                for h in store.all().unwrap() {
                    assert!(
                        (0.0..=1.0).contains(&h.confidence),
                        "{} out of range: {}",
                        h.principle,
                        h.confidence
                    );
                }
            }
        });
    }
}

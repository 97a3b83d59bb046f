//! Property tests: any sequence of commits forms a verifiable chain, and
//! rewriting any single stored entry is detected.

use crucible_ledger::Ledger;
use crucible_store::InMemoryStore;
use crucible_types::{ContentHash, ErrorClass, OpKind};
use proptest::prelude::*;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_op() -> impl Strategy<Value = OpKind> {
    prop_oneof![
        Just(OpKind::CatalystSelected),
        Just(OpKind::PlanProposed),
        Just(OpKind::DecisionRecorded),
        Just(OpKind::HeuristicWritten),
        Just(OpKind::VowAdherence),
        Just(OpKind::MetricsSnapshot),
    ]
}

fn arb_payloads() -> impl Strategy<Value = Vec<(OpKind, String, u32)>> {
    prop::collection::vec((arb_op(), "[a-z ]{0,24}", any::<u32>()), 1..24)
}

#[derive(Clone, Copy, Debug)]
enum Tamper {
    Hash,
    PrevHash,
    PayloadDigest,
    OpKind,
}

fn arb_tamper() -> impl Strategy<Value = Tamper> {
    prop_oneof![
        Just(Tamper::Hash),
        Just(Tamper::PrevHash),
        Just(Tamper::PayloadDigest),
        Just(Tamper::OpKind),
    ]
}

async fn committed(payloads: &[(OpKind, String, u32)]) -> (Arc<InMemoryStore>, Ledger) {
    let store = Arc::new(InMemoryStore::new());
    let ledger = Ledger::new(store.clone());
    for (op, note, n) in payloads {
        ledger
            .commit(*op, &serde_json::json!({ "note": note, "n": n }))
            .await
            .unwrap();
    }
    (store, ledger)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Every honest history verifies, links each entry to its predecessor
    /// and retains payloads that re-derive their digests.
    #[test]
    fn honest_histories_verify(payloads in arb_payloads()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (_, ledger) = committed(&payloads).await;
            let report = ledger.verify_chain().await.unwrap();
            assert_eq!(report.entries, payloads.len() as u64);
            assert_eq!(ledger.audit_payloads().await.unwrap(), payloads.len() as u64);

            let records = ledger.records().await.unwrap();
            assert!(records[0].entry.prev_hash.is_zero());
            for pair in records.windows(2) {
                assert_eq!(pair[1].entry.prev_hash, pair[0].entry.hash);
                assert_eq!(pair[1].entry.seq, pair[0].entry.seq + 1);
            }
            assert_eq!(report.tip, records.last().map(|r| r.entry.hash.clone()));
        });
    }

    /// Rewriting one header field of any entry breaks verification with an
    /// integrity error.
    #[test]
    fn any_header_rewrite_is_detected(
        payloads in arb_payloads(),
        pick in any::<prop::sample::Index>(),
        tamper in arb_tamper(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (store, ledger) = committed(&payloads).await;
            let seq = pick.index(payloads.len()) as u64;
            store
                .tamper_with(seq, |record| {
                    let entry = &mut record.entry;
                    match tamper {
                        Tamper::Hash => entry.hash = ContentHash::hash(b"forged hash"),
                        Tamper::PrevHash => entry.prev_hash = ContentHash::hash(b"forged link"),
                        Tamper::PayloadDigest => {
                            entry.payload_digest = ContentHash::hash(b"forged payload")
                        }
                        Tamper::OpKind => {
                            entry.op_kind = if entry.op_kind == OpKind::Halted {
                                OpKind::AuditCleared
                            } else {
                                OpKind::Halted
                            }
                        }
                    }
                })
                .unwrap();
            let err = ledger.verify_chain().await.unwrap_err();
            assert_eq!(err.class(), ErrorClass::IntegrityError);
        });
    }

    /// A rewritten payload leaves the chain intact but fails the payload
    /// audit.
    #[test]
    fn payload_rewrites_fail_the_audit(
        payloads in arb_payloads(),
        pick in any::<prop::sample::Index>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (store, ledger) = committed(&payloads).await;
            let seq = pick.index(payloads.len()) as u64;
            store
                .tamper_with(seq, |record| record.payload["note"] = "rewritten!".into())
                .unwrap();
            ledger.verify_chain().await.unwrap();
            let err = ledger.audit_payloads().await.unwrap_err();
            assert_eq!(err.class(), ErrorClass::IntegrityError);
        });
    }
}

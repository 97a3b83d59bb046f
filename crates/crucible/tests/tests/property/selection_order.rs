//! Property tests: catalyst selection depends only on the set of signals,
//! never on the order they arrive in.

use crucible_scanner::{select, SignalRecord};
use crucible_tests::signal;
use proptest::prelude::*;

// Narrow value ranges so ties on severity and timestamp are common.
fn arb_record() -> impl Strategy<Value = SignalRecord> {
    (
        prop::sample::select(vec![0.1, 0.4, 0.4, 0.7, 0.9]),
        prop::sample::select(vec!["billing", "checkout", "search"]),
        0i64..6,
        "[a-z]{1,6}",
    )
        .prop_map(|(severity, domain, secs, evidence)| signal(severity, domain, secs, &evidence))
}

fn arb_feed() -> impl Strategy<Value = (Vec<SignalRecord>, Vec<SignalRecord>)> {
    prop::collection::vec(arb_record(), 1..16)
        .prop_flat_map(|records| (Just(records.clone()), Just(records).prop_shuffle()))
}

proptest! {
    #[test]
    fn selection_ignores_arrival_order((records, shuffled) in arb_feed()) {
        let picked = select(&records).unwrap();
        prop_assert_eq!(picked, select(&shuffled).unwrap());

        let mut reversed = records.clone();
        reversed.reverse();
        prop_assert_eq!(picked, select(&reversed).unwrap());
    }

    #[test]
    fn selection_takes_the_earliest_of_the_most_severe(records in prop::collection::vec(arb_record(), 1..16)) {
        let picked = select(&records).unwrap();
        let max = records.iter().map(|r| r.severity).fold(f64::MIN, f64::max);
        prop_assert_eq!(picked.severity, max);

        let earliest = records
            .iter()
            .filter(|r| r.severity == max)
            .map(|r| r.observed_at)
            .min()
            .unwrap();
        prop_assert_eq!(picked.observed_at, earliest);

        let first_domain = records
            .iter()
            .filter(|r| r.severity == max && r.observed_at == earliest)
            .map(|r| r.domain_tag.as_str())
            .min()
            .unwrap();
        prop_assert_eq!(picked.domain_tag.as_str(), first_domain);
    }

    #[test]
    fn non_finite_severities_never_win(
        records in prop::collection::vec(arb_record(), 1..8),
        secs in 0i64..6,
    ) {
        let mut feed = records.clone();
        feed.push(signal(f64::NAN, "billing", secs, "corrupt"));
        feed.push(signal(f64::INFINITY, "search", secs, "corrupt"));
        prop_assert_eq!(select(&feed).unwrap(), select(&records).unwrap());
    }
}

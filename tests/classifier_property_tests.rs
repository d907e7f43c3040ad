//! Property-based tests for the position change classifier.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fundwatch::{
    models::{
        position::{Position, PositionKey, Snapshot},
        position_change::ChangeKind,
    },
    services::classifier::{classify, ClassifyOptions},
};

const HOLDERS: [&str; 3] = ["Avoro", "Baker Bros", "RTW"];
const INSTRUMENTS: [&str; 5] = ["INCY", "INSM", "MRNA", "VRTX", "XENE"];

fn position(holder: &str, instrument: &str, value: Decimal) -> Position {
    Position {
        holder_id: holder.to_string(),
        instrument_id: instrument.to_string(),
        name: instrument.to_string(),
        ticker: instrument.to_string(),
        cusip: String::new(),
        quantity: dec!(1),
        market_value: value,
        weight: dec!(0),
        ownership: dec!(0),
        category: None,
        as_of: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    }
}

/// Generates a snapshot with unique keys and values between 0 and 10,000.
fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    proptest::collection::btree_map(
        (0..HOLDERS.len(), 0..INSTRUMENTS.len()),
        0u32..10_000,
        0..12,
    )
    .prop_map(|entries: BTreeMap<(usize, usize), u32>| {
        let positions = entries
            .into_iter()
            .map(|((h, i), value)| position(HOLDERS[h], INSTRUMENTS[i], Decimal::from(value)))
            .collect();
        Snapshot::new(None, positions)
    })
}

fn arb_threshold() -> impl Strategy<Value = Decimal> {
    (0u32..300).prop_map(|bp| Decimal::new(bp as i64, 2))
}

fn keys(snapshot: &Snapshot) -> BTreeSet<PositionKey> {
    snapshot.positions().iter().map(Position::key).collect()
}

fn options(threshold: Decimal) -> ClassifyOptions {
    ClassifyOptions {
        threshold,
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Comparing a snapshot with itself never reports a change.
    #[test]
    fn prop_identical_snapshots_have_no_changes(
        snapshot in arb_snapshot(),
        threshold in arb_threshold(),
    ) {
        let classification = classify(&snapshot, &snapshot, &options(threshold)).unwrap();
        prop_assert!(classification.changes.is_empty());
        prop_assert_eq!(
            classification.unchanged.len() + classification.zero_prior.len(),
            snapshot.len()
        );
    }

    /// Every key of either snapshot lands in exactly one bucket.
    #[test]
    fn prop_every_key_is_classified_once(
        prior in arb_snapshot(),
        current in arb_snapshot(),
        threshold in arb_threshold(),
    ) {
        let classification = classify(&prior, &current, &options(threshold)).unwrap();

        let mut seen: Vec<PositionKey> = classification
            .changes
            .iter()
            .map(|change| PositionKey {
                holder_id: change.holder_id.clone(),
                instrument_id: change.instrument_id.clone(),
            })
            .collect();
        seen.extend(classification.unchanged.iter().cloned());
        seen.extend(classification.zero_prior.iter().cloned());

        let unique: BTreeSet<PositionKey> = seen.iter().cloned().collect();
        prop_assert_eq!(unique.len(), seen.len());

        let expected: BTreeSet<PositionKey> = keys(&prior).union(&keys(&current)).cloned().collect();
        prop_assert_eq!(unique, expected);
    }

    /// Without shared keys everything prior is closed and everything current is opened.
    #[test]
    fn prop_disjoint_snapshots_open_and_close_everything(
        prior in arb_snapshot(),
        current in arb_snapshot(),
    ) {
        let current_keys = keys(&current);
        let prior = Snapshot::new(
            None,
            prior
                .positions()
                .iter()
                .filter(|p| !current_keys.contains(&p.key()))
                .cloned()
                .collect(),
        );

        let classification = classify(&prior, &current, &ClassifyOptions::default()).unwrap();
        prop_assert_eq!(classification.count(ChangeKind::Opened), current.len());
        prop_assert_eq!(classification.count(ChangeKind::Closed), prior.len());
        prop_assert_eq!(classification.count(ChangeKind::Increased), 0);
        prop_assert_eq!(classification.count(ChangeKind::Decreased), 0);
    }

    /// A change exactly at the threshold is not material, one cent above is.
    #[test]
    fn prop_threshold_is_exclusive(
        prior_value in 1u32..100_000,
        threshold in arb_threshold(),
    ) {
        let prior_value = Decimal::from(prior_value);
        let at_threshold = prior_value * (dec!(1) + threshold);
        let prior = Snapshot::new(None, vec![position("Avoro", "MRNA", prior_value)]);

        let boundary = Snapshot::new(None, vec![position("Avoro", "MRNA", at_threshold)]);
        let classification = classify(&prior, &boundary, &options(threshold)).unwrap();
        prop_assert_eq!(classification.count(ChangeKind::Increased), 0);

        let above = Snapshot::new(
            None,
            vec![position("Avoro", "MRNA", at_threshold + dec!(0.01))],
        );
        let classification = classify(&prior, &above, &options(threshold)).unwrap();
        prop_assert_eq!(classification.count(ChangeKind::Increased), 1);
    }

    /// Row order of the inputs does not change the result.
    #[test]
    fn prop_input_order_is_irrelevant(
        prior in arb_snapshot(),
        current in arb_snapshot(),
    ) {
        let reversed = |snapshot: &Snapshot| {
            Snapshot::new(None, snapshot.positions().iter().rev().cloned().collect())
        };
        let forward = classify(&prior, &current, &ClassifyOptions::default()).unwrap();
        let backward =
            classify(&reversed(&prior), &reversed(&current), &ClassifyOptions::default()).unwrap();
        prop_assert_eq!(forward, backward);
    }
}

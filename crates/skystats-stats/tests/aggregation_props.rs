//! Property tests for time-bucketed aggregation.

use proptest::prelude::*;
use skystats_stats::{Aggregator, Granularity};

fn timestamp() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        6 => (2015i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60).prop_map(
            |(y, m, d, h, min)| Some(format!("{y:04}-{m:02}-{d:02}T{h:02}:{min:02}:00.000Z"))
        ),
        2 => (2015i32..2030, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| Some(format!("{y:04}-{m:02}-{d:02}"))),
        1 => Just(None::<String>),
        1 => "[a-z ]{0,12}".prop_map(Some),
    ]
}

fn valid_count(records: &[Option<String>], aggregator: &Aggregator) -> u64 {
    records
        .iter()
        .filter(|r| r.as_deref().and_then(|raw| aggregator.local_date(raw)).is_some())
        .count() as u64
}

proptest! {
    #[test]
    fn changes_sum_to_valid_record_count(records in prop::collection::vec(timestamp(), 0..200)) {
        let aggregator = Aggregator::default();
        let expected = valid_count(&records, &aggregator);

        for granularity in Granularity::ALL {
            let series = aggregator.aggregate(&records, granularity);
            let sum: u64 = series.iter_asc().map(|(_, s)| s.change).sum();
            prop_assert_eq!(sum, expected);
            prop_assert_eq!(series.total(), expected);
        }
    }

    #[test]
    fn running_totals_are_consistent(records in prop::collection::vec(timestamp(), 0..200)) {
        let series = Aggregator::default().aggregate_all(&records);
        prop_assert!(series.is_consistent());

        for granularity in Granularity::ALL {
            let totals: Vec<u64> = series.get(granularity).iter_asc().map(|(_, s)| s.cum_total).collect();
            prop_assert!(totals.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(series.get(granularity).iter_asc().all(|(_, s)| s.change > 0));
        }
    }

    #[test]
    fn aggregation_is_idempotent(records in prop::collection::vec(timestamp(), 0..100)) {
        let aggregator = Aggregator::from_timezone_name("Europe/Berlin").unwrap();
        prop_assert_eq!(aggregator.aggregate_all(&records), aggregator.aggregate_all(&records));
    }

    #[test]
    fn invalid_records_do_not_affect_valid_ones(
        valid in prop::collection::vec(timestamp(), 0..100),
        garbage in prop::collection::vec("[a-z]{1,10}", 0..20),
    ) {
        let aggregator = Aggregator::default();
        let mut noisy = valid.clone();
        noisy.extend(garbage.into_iter().map(Some));
        noisy.push(None);

        prop_assert_eq!(aggregator.aggregate_all(&valid), aggregator.aggregate_all(&noisy));
    }

    #[test]
    fn output_iterates_newest_first(records in prop::collection::vec(timestamp(), 0..100)) {
        let series = Aggregator::default().aggregate(&records, Granularity::Day);
        let keys: Vec<String> = series.iter_desc().map(|(k, _)| k.to_string()).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] > w[1]));
    }
}

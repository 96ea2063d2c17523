// Integration tests for axis bucketing: integer and duration indexes and
// sentinel ordering on a full chart axis.

use bbdash_core::bucket::{
    category_axis, duration_buckets, integer_buckets, AxisCategory, Closed, Sentinel,
};
use chrono::TimeDelta;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// Integer buckets
// ============================================================================

#[test]
fn integer_buckets_for_small_maximum_keep_unary_buckets() {
    let index = integer_buckets(1);
    let labels: Vec<&str> = index.labels().collect();
    assert_eq!(labels, vec!["0", "1", "2", "3", "4", "5 - 9", "10 - 99"]);
    assert_eq!(index.closed(), Closed::Left);
    assert_eq!(index.locate(0), Some(0));
    assert_eq!(index.locate(1), Some(1));
    assert_eq!(index.locate(7), Some(5));
}

#[test]
fn integer_buckets_scale_with_maximum() {
    let index = integer_buckets(100);
    let last = index.buckets().last().unwrap();
    assert_eq!((last.lo, last.hi), (100, 1_000));
    assert_eq!(last.label, "100 - 999");

    let index = integer_buckets(12_345);
    let labels: Vec<&str> = index.labels().collect();
    assert_eq!(
        labels,
        vec!["0", "1", "2", "3", "4", "5 - 9", "10 - 99", "100 - 999", "1,000 - 9,999", "10,000 - 99,999"]
    );
}

#[test]
fn integer_buckets_cover_maximum_just_below_power_of_ten() {
    let index = integer_buckets(99);
    assert_eq!(index.buckets().last().unwrap().hi, 100);
    assert_eq!(index.locate(99), Some(index.len() - 1));
}

#[test]
fn integer_buckets_cover_the_largest_count() {
    for max in [u64::MAX - 1, u64::MAX] {
        let index = integer_buckets(max);
        assert_eq!(index.locate(max), Some(index.len() - 1));
        assert_eq!(index.locate(0), Some(0));
    }
}

// ============================================================================
// Duration buckets
// ============================================================================

#[test]
fn duration_bounds_are_right_closed() {
    let index = duration_buckets(TimeDelta::zero());
    assert_eq!(index.closed(), Closed::Right);
    assert_eq!(index.locate(TimeDelta::seconds(60)), Some(1));
    assert_eq!(index.locate(TimeDelta::seconds(61)), Some(2));
    assert_eq!(index.locate(TimeDelta::days(1)), Some(2));
    assert_eq!(index.locate(TimeDelta::days(400)), None);
}

#[test]
fn duration_buckets_add_tail_beyond_a_year() {
    let max = TimeDelta::days(400) + TimeDelta::minutes(30);
    let index = duration_buckets(max);
    assert_eq!(index.len(), 7);
    assert_eq!(
        index.buckets().last().unwrap().label,
        "≤ 400 days 00:30:00"
    );
    assert_eq!(index.locate(max), Some(6));
}

// ============================================================================
// Axis
// ============================================================================

#[test]
fn sentinels_sort_before_buckets() {
    let index = duration_buckets(TimeDelta::days(2));
    let axis = category_axis(
        &[Sentinel::UnallocatedActive, Sentinel::Pending, Sentinel::Pending],
        &index,
    );
    let labels: Vec<&str> = axis.iter().map(AxisCategory::label).collect();
    assert_eq!(&labels[..3], &["Pending", "Unallocated, active", "≤ 1s"]);
    assert_eq!(axis.len(), 2 + index.len());

    let mut shuffled = axis.clone();
    shuffled.reverse();
    shuffled.sort();
    assert_eq!(shuffled, axis);
}

#[test]
fn axis_serializes_as_labels() {
    let index = integer_buckets(3);
    let axis = category_axis(&[], &index);
    let json = serde_json::to_value(&axis[..2]).unwrap();
    assert_eq!(json, serde_json::json!(["0", "1"]));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn every_value_up_to_max_lands_in_exactly_one_bucket(max in 0u64..5_000_000, pick in any::<prop::sample::Index>()) {
        let index = integer_buckets(max);
        let value = pick.index(usize::try_from(max).unwrap() + 1) as u64;
        let pos = index.locate(value);
        prop_assert!(pos.is_some(), "{value} not covered for max {max}");
        let hits = index
            .buckets()
            .iter()
            .filter(|b| b.contains(&value, Closed::Left))
            .count();
        prop_assert_eq!(hits, 1);
    }

    #[test]
    fn integer_buckets_are_contiguous_and_cover_max(max in any::<u64>()) {
        let index = integer_buckets(max);
        for pair in index.buckets().windows(2) {
            prop_assert_eq!(pair[0].hi, pair[1].lo);
        }
        prop_assert_eq!(index.buckets()[0].lo, 0);
        prop_assert!(index.locate(max).is_some(), "max {} not covered", max);
    }

    #[test]
    fn durations_up_to_max_are_covered(secs in 0i64..(3 * 365 * 86_400)) {
        let value = TimeDelta::seconds(secs);
        let index = duration_buckets(value);
        prop_assert!(index.locate(value).is_some());
    }
}

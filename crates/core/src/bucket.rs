// crates/core/src/bucket.rs
//! Adaptive bucketing for distribution charts.
//!
//! Every distribution chart groups an unbounded value column into a handful
//! of labeled intervals. Counts use log-scaled integer buckets
//! ([`integer_buckets`]); durations use fixed calendar breakpoints
//! ([`duration_buckets`]). Both are rebuilt from the current result set's
//! maximum on every chart render and hold no state.
//!
//! Out-of-band categories that are not derived from any interval (a missing
//! end event, a milestone never reached) are modelled as [`Sentinel`]s and
//! always sort before the numeric buckets on a chart axis.

use std::fmt;

use chrono::TimeDelta;
use serde::{Serialize, Serializer};

use crate::metrics::format_thousands;

/// Values below this bound get a bucket of their own.
pub const UNARY_LIMIT: u64 = 5;

/// Label that replaces `"0"` for columns where 0 encodes "no limit".
pub const UNLIMITED: &str = "Unlimited";

/// Which end of an interval is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Closed {
    /// `[lo, hi)`
    Left,
    /// `(lo, hi]`
    Right,
}

/// One labeled interval of a [`BucketIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket<T> {
    pub lo: T,
    pub hi: T,
    pub label: String,
}

impl<T: PartialOrd> Bucket<T> {
    pub fn contains(&self, value: &T, closed: Closed) -> bool {
        match closed {
            Closed::Left => self.lo <= *value && *value < self.hi,
            Closed::Right => self.lo < *value && *value <= self.hi,
        }
    }
}

/// Ordered, contiguous, disjoint buckets covering one value range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketIndex<T> {
    closed: Closed,
    buckets: Vec<Bucket<T>>,
    /// A left-closed last bucket also contains its upper edge.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    end_inclusive: bool,
}

impl<T: Copy + PartialOrd + fmt::Debug> BucketIndex<T> {
    /// Build buckets between consecutive `breaks`.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two breaks are given or they are not strictly
    /// increasing. Both indicate a bug in the caller, not bad data.
    pub fn from_breaks(breaks: &[T], closed: Closed, label: impl Fn(T, T, Closed) -> String) -> Self {
        assert!(
            breaks.len() >= 2,
            "a bucket index needs at least two breaks, got {breaks:?}"
        );
        assert!(
            breaks.windows(2).all(|w| w[0] < w[1]),
            "bucket breaks must be strictly increasing: {breaks:?}"
        );
        let buckets = breaks
            .windows(2)
            .map(|w| Bucket {
                lo: w[0],
                hi: w[1],
                label: label(w[0], w[1], closed),
            })
            .collect();
        Self {
            closed,
            buckets,
            end_inclusive: false,
        }
    }

    pub fn closed(&self) -> Closed {
        self.closed
    }

    pub fn buckets(&self) -> &[Bucket<T>] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.label.as_str())
    }

    /// Index of the bucket containing `value`, or `None` if it lies outside
    /// the covered range.
    pub fn locate(&self, value: T) -> Option<usize> {
        let idx = match self.closed {
            Closed::Left => self.buckets.partition_point(|b| b.hi <= value),
            Closed::Right => self.buckets.partition_point(|b| b.hi < value),
        };
        match self.buckets.get(idx) {
            Some(bucket) if bucket.contains(&value, self.closed) => Some(idx),
            _ => self.at_inclusive_end(value).then(|| self.buckets.len() - 1),
        }
    }

    fn at_inclusive_end(&self, value: T) -> bool {
        self.end_inclusive
            && self.closed == Closed::Left
            && self.buckets.last().is_some_and(|last| last.hi == value)
    }

    /// Make the last bucket of a left-closed index contain its upper edge
    /// too, relabeling it with `label(lo, hi)`. Right-closed indexes already
    /// contain it and are only relabeled.
    pub fn close_last_bucket(mut self, label: impl FnOnce(T, T) -> String) -> Self {
        if let Some(last) = self.buckets.last_mut() {
            last.label = label(last.lo, last.hi);
            self.end_inclusive = true;
        }
        self
    }

    /// Index of the bucket carrying `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.buckets.iter().position(|b| b.label == label)
    }

    /// Replace the label `from` with `to`, leaving all other labels as they are.
    pub fn relabel(mut self, from: &str, to: &str) -> Self {
        for bucket in self.buckets.iter_mut().filter(|b| b.label == from) {
            bucket.label = to.to_string();
        }
        self
    }
}

impl BucketIndex<u64> {
    /// Show the zero bucket as [`UNLIMITED`], for columns where 0 stands in
    /// for a missing limit.
    pub fn with_unlimited_zero(self) -> Self {
        self.relabel("0", UNLIMITED)
    }
}

// ============================================================================
// Integer buckets
// ============================================================================

/// Log-scaled buckets for non-negative counts up to `max_value`.
///
/// Breaks are `0, 1, …, 5` followed by the powers of ten `10¹ … 10^maxexp`
/// with `maxexp = max(2, floor(log10(max_value)) + 1)`. The unary buckets
/// always exist, so a column whose maximum is 0 or 1 still gets a full
/// index. If `max_value` is not covered by the last break, the last bucket
/// is widened to include it. At `u64::MAX` there is no edge past the
/// maximum, so the last bucket becomes `[lo, u64::MAX]`.
pub fn integer_buckets(max_value: u64) -> BucketIndex<u64> {
    let maxexp = max_value
        .checked_ilog10()
        .map_or(2, |exp| (exp + 1).max(2));

    let mut breaks: Vec<u64> = (0..=UNARY_LIMIT).collect();
    breaks.extend((1..=maxexp).map_while(|exp| 10u64.checked_pow(exp)));

    if let Some(last) = breaks.last_mut() {
        if max_value >= *last {
            *last = max_value.saturating_add(1);
        }
    }

    let mut index = BucketIndex::from_breaks(&breaks, Closed::Left, int_bucket_label);
    if max_value == u64::MAX {
        index = index.close_last_bucket(|lo, hi| {
            format!("{} - {}", format_thousands(lo), format_thousands(hi))
        });
    }
    tracing::trace!(max_value, maxexp, buckets = index.len(), "built integer buckets");
    index
}

/// Label of an integer bucket `[lo, hi)`.
///
/// A bucket holding a single integer is labeled with that integer, wider
/// buckets as `"{lo} - {hi - 1}"`. Both use thousands separators.
///
/// # Panics
///
/// Panics for right-closed intervals, which integer buckets never use.
pub fn int_bucket_label(lo: u64, hi: u64, closed: Closed) -> String {
    assert_eq!(
        closed,
        Closed::Left,
        "integer bucket labels are only defined for left-closed intervals"
    );
    if hi - lo == 1 {
        format_thousands(lo)
    } else {
        format!("{} - {}", format_thousands(lo), format_thousands(hi - 1))
    }
}

// ============================================================================
// Duration buckets
// ============================================================================

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Fixed right-closed duration breaks, in seconds.
///
/// The first break is -1s so that the first bucket `(-1s, 1s]` includes an
/// exact zero.
const DURATION_BREAK_SECS: [i64; 7] = [
    -1,
    1,
    SECS_PER_MINUTE,
    SECS_PER_DAY,
    7 * SECS_PER_DAY,
    31 * SECS_PER_DAY,
    365 * SECS_PER_DAY,
];

/// Calendar-scaled buckets for durations up to `max_duration`.
///
/// Buckets are `(-1s, 1s]`, `(1s, 1min]`, `(1min, 1d]`, `(1d, 7d]`,
/// `(7d, 31d]`, `(31d, 365d]`, plus `(365d, max_duration]` when the maximum
/// exceeds a year.
pub fn duration_buckets(max_duration: TimeDelta) -> BucketIndex<TimeDelta> {
    let mut breaks: Vec<TimeDelta> = DURATION_BREAK_SECS
        .iter()
        .map(|secs| TimeDelta::seconds(*secs))
        .collect();
    if breaks.last().is_some_and(|last| max_duration > *last) {
        breaks.push(max_duration);
    }

    let index = BucketIndex::from_breaks(&breaks, Closed::Right, |_, hi, closed| {
        assert_eq!(
            closed,
            Closed::Right,
            "duration bucket labels are only defined for right-closed intervals"
        );
        duration_bucket_label(hi)
    });
    tracing::trace!(buckets = index.len(), "built duration buckets");
    index
}

/// Label of a right-closed duration bucket with upper bound `upper`.
///
/// If `upper` consists of exactly one non-zero unit the label is
/// abbreviated (`"≤ 1h"`, `"≤ 7d"`); otherwise the full textual duration is
/// used (`"≤ 1 days 00:30:00"`).
pub fn duration_bucket_label(upper: TimeDelta) -> String {
    match DurationComponents::of(upper).single_unit() {
        Some((amount, unit)) => format!("≤ {amount}{unit}"),
        None => format!("≤ {}", format_duration_long(upper)),
    }
}

/// A duration split into calendar-free units, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationComponents {
    pub negative: bool,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub millis: i64,
    pub micros: i64,
    pub nanos: i64,
}

impl DurationComponents {
    pub fn of(duration: TimeDelta) -> Self {
        let negative = duration < TimeDelta::zero();
        let magnitude = if negative { -duration } else { duration };
        let secs = magnitude.num_seconds();
        let sub = i64::from(magnitude.subsec_nanos());
        Self {
            negative,
            days: secs / SECS_PER_DAY,
            hours: (secs % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (secs % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: secs % SECS_PER_MINUTE,
            millis: sub / 1_000_000,
            micros: (sub / 1_000) % 1_000,
            nanos: sub % 1_000,
        }
    }

    /// `(amount, unit abbreviation)` when exactly one unit is non-zero.
    pub fn single_unit(&self) -> Option<(i64, &'static str)> {
        if self.negative {
            return None;
        }
        let units = [
            (self.days, "d"),
            (self.hours, "h"),
            (self.minutes, "min"),
            (self.seconds, "s"),
            (self.millis, "ms"),
            (self.micros, "us"),
            (self.nanos, "ns"),
        ];
        let mut non_zero = units.into_iter().filter(|(amount, _)| *amount != 0);
        match (non_zero.next(), non_zero.next()) {
            (Some(unit), None) => Some(unit),
            _ => None,
        }
    }
}

/// Full textual form of a duration: `"{days} days HH:MM:SS[.fraction]"`.
///
/// The fraction is omitted for whole seconds, printed with 6 digits when the
/// sub-second part is a whole number of microseconds and with 9 otherwise.
pub fn format_duration_long(duration: TimeDelta) -> String {
    let c = DurationComponents::of(duration);
    let sign = if c.negative { "-" } else { "" };
    let sub_nanos = c.millis * 1_000_000 + c.micros * 1_000 + c.nanos;
    let fraction = if sub_nanos == 0 {
        String::new()
    } else if c.nanos == 0 {
        format!(".{:06}", sub_nanos / 1_000)
    } else {
        format!(".{sub_nanos:09}")
    };
    format!(
        "{sign}{} days {:02}:{:02}:{:02}{fraction}",
        c.days, c.hours, c.minutes, c.seconds
    )
}

// ============================================================================
// Axis categories
// ============================================================================

/// Out-of-band chart categories that are not derived from an interval.
///
/// Declaration order is axis order among sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sentinel {
    /// The terminating event has not happened yet (null duration).
    Pending,
    /// Never reached the measured milestone and already expired.
    UnallocatedExpired,
    /// Never reached the measured milestone and still valid.
    UnallocatedActive,
}

impl Sentinel {
    pub fn label(self) -> &'static str {
        match self {
            Sentinel::Pending => "Pending",
            Sentinel::UnallocatedExpired => "Unallocated, expired",
            Sentinel::UnallocatedActive => "Unallocated, active",
        }
    }

    /// Sentinel for an entity that never reached its milestone.
    pub fn unallocated(expired: bool) -> Self {
        if expired {
            Sentinel::UnallocatedExpired
        } else {
            Sentinel::UnallocatedActive
        }
    }
}

/// One category on a distribution chart's x-axis.
///
/// The derived ordering puts every sentinel before every bucket, sentinels
/// in declaration order and buckets by index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisCategory {
    Sentinel(Sentinel),
    Bucket { index: usize, label: String },
}

impl AxisCategory {
    pub fn label(&self) -> &str {
        match self {
            AxisCategory::Sentinel(s) => s.label(),
            AxisCategory::Bucket { label, .. } => label,
        }
    }
}

impl fmt::Display for AxisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AxisCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Full axis for `index`, with `sentinels` placed in front.
pub fn category_axis<T>(sentinels: &[Sentinel], index: &BucketIndex<T>) -> Vec<AxisCategory> {
    let mut sentinels = sentinels.to_vec();
    sentinels.sort();
    sentinels.dedup();
    sentinels
        .into_iter()
        .map(AxisCategory::Sentinel)
        .chain(index.buckets.iter().enumerate().map(|(i, b)| AxisCategory::Bucket {
            index: i,
            label: b.label.clone(),
        }))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bounds(index: &BucketIndex<u64>) -> Vec<(u64, u64)> {
        index.buckets().iter().map(|b| (b.lo, b.hi)).collect()
    }

    // ========================================================================
    // Integer buckets
    // ========================================================================

    #[test]
    fn test_integer_buckets_small_max_keeps_unary_buckets() {
        for max in [0, 1] {
            let index = integer_buckets(max);
            assert_eq!(
                bounds(&index),
                vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 10), (10, 100)]
            );
        }
    }

    #[test]
    fn test_integer_buckets_labels() {
        let index = integer_buckets(1);
        let labels: Vec<&str> = index.labels().collect();
        assert_eq!(labels, vec!["0", "1", "2", "3", "4", "5 - 9", "10 - 99"]);
    }

    #[test]
    fn test_integer_buckets_grow_with_max() {
        // floor(log10(1234)) + 1 = 4 → edges up to 10^4.
        let index = integer_buckets(1_234);
        assert_eq!(index.buckets().last().map(|b| b.hi), Some(10_000));
        assert_eq!(index.labels().last(), Some("1,000 - 9,999"));
        assert_eq!(index.locate(1_234), Some(index.len() - 1));
    }

    #[test]
    fn test_integer_buckets_power_of_ten_max_is_covered() {
        // 100 sits at a break; it must land in [100, 1000).
        let index = integer_buckets(100);
        let idx = index.locate(100).unwrap();
        assert_eq!(index.buckets()[idx].label, "100 - 999");
    }

    #[test]
    fn test_integer_buckets_huge_max_extends_last_bucket() {
        let max = 15_000_000_000_000_000_000;
        let index = integer_buckets(max);
        let last = index.buckets().last().unwrap();
        assert_eq!(last.hi, max + 1);
        assert_eq!(index.locate(max), Some(index.len() - 1));
    }

    #[test]
    fn test_integer_buckets_cover_u64_max() {
        let index = integer_buckets(u64::MAX);
        let last = index.buckets().last().unwrap();
        assert_eq!((last.lo, last.hi), (1_000_000_000_000_000_000, u64::MAX));
        assert_eq!(index.locate(u64::MAX), Some(index.len() - 1));
        assert_eq!(index.locate(u64::MAX - 1), Some(index.len() - 1));
        assert_eq!(
            last.label,
            "1,000,000,000,000,000,000 - 18,446,744,073,709,551,615"
        );
    }

    #[test]
    fn test_open_end_stays_excluded_by_default() {
        let index = integer_buckets(50);
        assert_eq!(index.locate(100), None);
        let closed = index.close_last_bucket(|lo, hi| format!("{lo}..={hi}"));
        assert_eq!(closed.locate(100), Some(closed.len() - 1));
        assert_eq!(closed.labels().last(), Some("10..=100"));
    }

    #[test]
    fn test_int_bucket_label() {
        assert_eq!(int_bucket_label(0, 1, Closed::Left), "0");
        assert_eq!(int_bucket_label(1, 10, Closed::Left), "1 - 9");
        assert_eq!(int_bucket_label(1_000, 1_001, Closed::Left), "1,000");
        assert_eq!(int_bucket_label(1_000, 10_000, Closed::Left), "1,000 - 9,999");
    }

    #[test]
    #[should_panic(expected = "left-closed")]
    fn test_int_bucket_label_rejects_right_closed() {
        int_bucket_label(0, 10, Closed::Right);
    }

    #[test]
    fn test_unlimited_zero_relabel() {
        let index = integer_buckets(0).with_unlimited_zero();
        let labels: Vec<&str> = index.labels().collect();
        assert_eq!(labels[0], UNLIMITED);
        assert_eq!(labels[1], "1");
        assert_eq!(index.position(UNLIMITED), Some(0));
        assert_eq!(index.position("0"), None);
    }

    #[test]
    fn test_locate_left_closed() {
        let index = integer_buckets(50);
        assert_eq!(index.locate(0), Some(0));
        assert_eq!(index.locate(4), Some(4));
        assert_eq!(index.locate(5), Some(5));
        assert_eq!(index.locate(9), Some(5));
        assert_eq!(index.locate(10), Some(6));
        assert_eq!(index.locate(100), None);
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_from_breaks_rejects_unsorted() {
        BucketIndex::from_breaks(&[0u64, 5, 5], Closed::Left, int_bucket_label);
    }

    // ========================================================================
    // Duration buckets
    // ========================================================================

    #[test]
    fn test_duration_buckets_fixed_breaks() {
        let index = duration_buckets(TimeDelta::hours(2));
        let labels: Vec<&str> = index.labels().collect();
        assert_eq!(labels, vec!["≤ 1s", "≤ 1min", "≤ 1d", "≤ 7d", "≤ 31d", "≤ 365d"]);
        assert_eq!(index.closed(), Closed::Right);
    }

    #[test]
    fn test_duration_buckets_include_zero() {
        let index = duration_buckets(TimeDelta::zero());
        assert_eq!(index.locate(TimeDelta::zero()), Some(0));
        assert_eq!(index.locate(TimeDelta::seconds(1)), Some(0));
        assert_eq!(index.locate(TimeDelta::milliseconds(1_001)), Some(1));
    }

    #[test]
    fn test_duration_buckets_extend_past_a_year() {
        let max = TimeDelta::days(400) + TimeDelta::hours(3);
        let index = duration_buckets(max);
        assert_eq!(index.len(), 7);
        assert_eq!(index.locate(max), Some(6));
        assert_eq!(index.labels().last(), Some("≤ 400 days 03:00:00"));
    }

    #[test]
    fn test_duration_buckets_whole_days_max_abbreviates() {
        let index = duration_buckets(TimeDelta::days(2_000));
        assert_eq!(index.labels().last(), Some("≤ 2000d"));
    }

    #[test]
    fn test_duration_label_single_unit() {
        assert_eq!(duration_bucket_label(TimeDelta::hours(1)), "≤ 1h");
        assert_eq!(duration_bucket_label(TimeDelta::minutes(1)), "≤ 1min");
        assert_eq!(duration_bucket_label(TimeDelta::milliseconds(250)), "≤ 250ms");
        assert_eq!(duration_bucket_label(TimeDelta::microseconds(3)), "≤ 3us");
        assert_eq!(duration_bucket_label(TimeDelta::nanoseconds(7)), "≤ 7ns");
    }

    #[test]
    fn test_duration_label_falls_back_to_full_text() {
        let upper = TimeDelta::days(1) + TimeDelta::minutes(30);
        assert_eq!(duration_bucket_label(upper), "≤ 1 days 00:30:00");
    }

    #[test]
    fn test_format_duration_long_fractions() {
        assert_eq!(format_duration_long(TimeDelta::milliseconds(1_500)), "0 days 00:00:01.500000");
        assert_eq!(format_duration_long(TimeDelta::nanoseconds(500)), "0 days 00:00:00.000000500");
        assert_eq!(format_duration_long(TimeDelta::seconds(-1)), "-0 days 00:00:01");
    }

    // ========================================================================
    // Axis categories
    // ========================================================================

    #[test]
    fn test_sentinels_sort_before_buckets() {
        let index = duration_buckets(TimeDelta::hours(1));
        let axis = category_axis(&[Sentinel::UnallocatedActive, Sentinel::UnallocatedExpired], &index);
        let labels: Vec<&str> = axis.iter().map(AxisCategory::label).collect();
        assert_eq!(&labels[..3], &["Unallocated, expired", "Unallocated, active", "≤ 1s"]);

        let mut shuffled = axis.clone();
        shuffled.reverse();
        shuffled.sort();
        assert_eq!(shuffled, axis);
    }

    #[test]
    fn test_axis_category_serializes_as_label() {
        let json = serde_json::to_string(&AxisCategory::Sentinel(Sentinel::Pending)).unwrap();
        assert_eq!(json, "\"Pending\"");
    }
}

// crates/dashboard/src/charts.rs
//! Chart-ready series for the distribution charts.
//!
//! Query rows come in already reduced to `(client type, value, weight)`;
//! this module buckets the values, faceted per client type, and hands a
//! serializable [`Histogram`] to the rendering frontend.

use std::collections::BTreeMap;
use std::fmt;

use bbdash_core::bucket::{category_axis, duration_buckets, integer_buckets, AxisCategory, Sentinel};
use bbdash_core::metrics::{allocation_usage_ratio, max_present, round_share};
use bbdash_core::{
    ClientClassifier, ClientType, CodeCategory, DeviceType, DATAWALLET_MODIFICATION_COLLECTIONS,
};
use chrono::TimeDelta;
use serde::Serialize;

use crate::catalog::PlotSpec;

// ============================================================================
// Histogram
// ============================================================================

/// Ordered axis plus one count series per client type.
///
/// Every facet has exactly one entry per axis category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub axis: Vec<AxisCategory>,
    pub facets: BTreeMap<ClientType, Vec<u64>>,
}

impl Histogram {
    fn new(axis: Vec<AxisCategory>, client_types: impl IntoIterator<Item = ClientType>) -> Self {
        let facets = client_types
            .into_iter()
            .map(|ct| (ct, vec![0; axis.len()]))
            .collect();
        Self { axis, facets }
    }

    fn add(&mut self, client_type: ClientType, position: usize, weight: u64) {
        let len = self.axis.len();
        let counts = self.facets.entry(client_type).or_insert_with(|| vec![0; len]);
        counts[position] += weight;
    }

    pub fn labels(&self) -> Vec<&str> {
        self.axis.iter().map(AxisCategory::label).collect()
    }

    pub fn facet(&self, client_type: ClientType) -> Option<&[u64]> {
        self.facets.get(&client_type).map(Vec::as_slice)
    }

    /// Sum over all facets, per axis category.
    pub fn totals(&self) -> Vec<u64> {
        let mut totals = vec![0; self.axis.len()];
        for counts in self.facets.values() {
            for (total, count) in totals.iter_mut().zip(counts) {
                *total += count;
            }
        }
        totals
    }

    fn observed_mask(&self) -> Vec<bool> {
        self.totals().into_iter().map(|t| t > 0).collect()
    }

    fn retain_positions(&mut self, keep: &[bool]) {
        retain_by_mask(&mut self.axis, keep);
        for counts in self.facets.values_mut() {
            retain_by_mask(counts, keep);
        }
    }

    /// Drop axis categories without any observation.
    pub fn retain_observed(&mut self) {
        let keep = self.observed_mask();
        self.retain_positions(&keep);
    }
}

fn retain_by_mask<T>(items: &mut Vec<T>, keep: &[bool]) {
    let mut keep = keep.iter().copied();
    items.retain(|_| keep.next().unwrap_or(true));
}

// ============================================================================
// Integer distributions
// ============================================================================

/// One aggregated query row of an integer distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRow {
    pub client_type: ClientType,
    pub value: u64,
    /// Number of entities with this value.
    pub weight: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntHistogramOptions {
    /// Label the zero bucket `Unlimited`.
    pub unlimited_zero: bool,
    /// Drop buckets nobody falls into.
    pub observed_only: bool,
}

impl IntHistogramOptions {
    pub fn for_plot(spec: &PlotSpec) -> Self {
        Self {
            unlimited_zero: spec.zero_means_unlimited,
            observed_only: spec.zero_means_unlimited,
        }
    }
}

/// Bucket `rows` with [`integer_buckets`] seeded by their maximum value.
///
/// Returns `None` for an empty result set.
pub fn int_histogram(rows: &[IntRow], opts: IntHistogramOptions) -> Option<Histogram> {
    let max = max_present(rows.iter().map(|r| Some(r.value)))?;
    let mut index = integer_buckets(max);
    if opts.unlimited_zero {
        index = index.with_unlimited_zero();
    }

    let mut histogram = Histogram::new(category_axis(&[], &index), rows.iter().map(|r| r.client_type));
    for row in rows {
        match index.locate(row.value) {
            Some(pos) => histogram.add(row.client_type, pos, row.weight),
            None => tracing::warn!(value = row.value, max, "Value outside of integer buckets, skipped"),
        }
    }
    if opts.observed_only {
        histogram.retain_observed();
    }
    Some(histogram)
}

/// A per-client query row before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientValue {
    pub client_id: String,
    pub value: u64,
    pub weight: u64,
}

/// Classify `rows` by client, dropping test clients when `hide_test_clients`.
pub fn classify_rows(
    classifier: &ClientClassifier,
    mut rows: Vec<ClientValue>,
    hide_test_clients: bool,
) -> Vec<IntRow> {
    classifier.retain_visible(&mut rows, hide_test_clients, |r| r.client_id.as_str());
    rows.into_iter()
        .map(|r| IntRow {
            client_type: classifier.client_type(&r.client_id),
            value: r.value,
            weight: r.weight,
        })
        .collect()
}

// ============================================================================
// Duration distributions
// ============================================================================

/// A duration measurement, or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Measured(TimeDelta),
    Sentinel(Sentinel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRow {
    pub client_type: ClientType,
    pub sample: Sample,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationHistogramOptions {
    /// Sentinels shown on the axis even without observations.
    pub sentinels: Vec<Sentinel>,
    /// Drop categories nobody falls into, sentinels included.
    pub observed_only: bool,
}

/// Bucket duration samples with [`duration_buckets`]; sentinels go first.
///
/// A result set with only sentinel samples still gets the fixed buckets.
pub fn duration_histogram(rows: &[DurationRow], opts: &DurationHistogramOptions) -> Histogram {
    let max = max_present(rows.iter().map(|r| match r.sample {
        Sample::Measured(d) => Some(d),
        Sample::Sentinel(_) => None,
    }))
    .unwrap_or_else(TimeDelta::zero);
    let index = duration_buckets(max);

    let mut sentinels = opts.sentinels.clone();
    sentinels.extend(rows.iter().filter_map(|r| match r.sample {
        Sample::Sentinel(s) => Some(s),
        Sample::Measured(_) => None,
    }));
    let axis = category_axis(&sentinels, &index);
    let offset = axis.len() - index.len();

    let mut histogram = Histogram::new(axis, rows.iter().map(|r| r.client_type));
    for row in rows {
        let position = match row.sample {
            Sample::Sentinel(s) => histogram.axis.iter().position(|c| *c == AxisCategory::Sentinel(s)),
            Sample::Measured(d) => index.locate(d).map(|i| i + offset),
        };
        match position {
            Some(pos) => histogram.add(row.client_type, pos, 1),
            None => tracing::warn!(sample = ?row.sample, "Duration outside of buckets, skipped"),
        }
    }
    if opts.observed_only {
        histogram.retain_observed();
    }
    histogram
}

// ============================================================================
// Relationship template allocations
// ============================================================================

/// Allocation counters of one relationship template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateAllocations {
    pub creator: ClientType,
    pub num_allocations: u64,
    /// `None` or 0: no limit.
    pub max_allocations: Option<u64>,
}

/// Templates per allocation-limit bucket, with the mean usage share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationHistogram {
    #[serde(flatten)]
    pub histogram: Histogram,
    /// Mean of `num_allocations / max_allocations` per facet and bucket,
    /// over templates with a limit; 0 where no template has one.
    pub mean_usage: BTreeMap<ClientType, Vec<f64>>,
}

/// One histogram row per template, keyed by its limit (0 for unlimited).
pub fn allocation_rows(templates: &[TemplateAllocations]) -> Vec<IntRow> {
    templates
        .iter()
        .map(|t| IntRow {
            client_type: t.creator,
            value: t.max_allocations.unwrap_or(0),
            weight: 1,
        })
        .collect()
}

/// Templates bucketed by allocation limit, zero shown as `Unlimited`.
///
/// Only observed buckets are kept.
pub fn allocation_histogram(templates: &[TemplateAllocations]) -> Option<AllocationHistogram> {
    let opts = IntHistogramOptions {
        unlimited_zero: true,
        observed_only: false,
    };
    let mut histogram = int_histogram(&allocation_rows(templates), opts)?;

    // (sum of ratios, number of ratios) per facet and bucket
    let mut sums: BTreeMap<ClientType, Vec<(f64, u32)>> = histogram
        .facets
        .keys()
        .map(|ct| (*ct, vec![(0.0, 0); histogram.axis.len()]))
        .collect();
    let index = integer_buckets(max_present(templates.iter().map(|t| Some(t.max_allocations.unwrap_or(0))))?);
    for t in templates {
        let ratio = allocation_usage_ratio(t.num_allocations, t.max_allocations);
        let (Some(ratio), Some(pos)) = (ratio, index.locate(t.max_allocations.unwrap_or(0))) else {
            continue;
        };
        if let Some(slot) = sums.get_mut(&t.creator).and_then(|v| v.get_mut(pos)) {
            slot.0 += ratio;
            slot.1 += 1;
        }
    }
    let mut mean_usage: BTreeMap<ClientType, Vec<f64>> = sums
        .into_iter()
        .map(|(ct, slots)| {
            let means = slots
                .into_iter()
                .map(|(sum, n)| if n == 0 { 0.0 } else { round_share(sum / f64::from(n)) })
                .collect();
            (ct, means)
        })
        .collect();

    let keep = histogram.observed_mask();
    histogram.retain_positions(&keep);
    for means in mean_usage.values_mut() {
        retain_by_mask(means, &keep);
    }
    Some(AllocationHistogram {
        histogram,
        mean_usage,
    })
}

// ============================================================================
// Categorical distributions
// ============================================================================

/// One aggregated query row of a categorical chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRow<K> {
    pub client_type: ClientType,
    pub category: K,
    pub weight: u64,
}

/// Count `rows` per category on a fixed axis given by `categories`.
///
/// Every category stays on the axis even without rows; rows whose category
/// is not on it are skipped.
pub fn categorical_histogram<K: PartialEq + fmt::Display>(
    categories: &[K],
    rows: &[CategoryRow<K>],
) -> Histogram {
    let axis = categories
        .iter()
        .enumerate()
        .map(|(index, category)| AxisCategory::Bucket {
            index,
            label: category.to_string(),
        })
        .collect();
    let mut histogram = Histogram::new(axis, rows.iter().map(|r| r.client_type));
    for row in rows {
        match categories.iter().position(|c| *c == row.category) {
            Some(pos) => histogram.add(row.client_type, pos, row.weight),
            None => tracing::warn!(category = %row.category, "Category not on chart axis, skipped"),
        }
    }
    histogram
}

/// Count rows of stored codes under the display names of `C`.
pub fn code_histogram<C: CodeCategory>(rows: &[CategoryRow<i32>]) -> Histogram {
    let decoded: Vec<CategoryRow<C>> = rows
        .iter()
        .filter_map(|row| {
            let Some(category) = C::from_code(row.category) else {
                tracing::warn!(code = row.category, "Unknown code, skipped");
                return None;
            };
            Some(CategoryRow {
                client_type: row.client_type,
                category,
                weight: row.weight,
            })
        })
        .collect();
    categorical_histogram(C::ALL, &decoded)
}

/// Datawallet modifications per target collection.
pub fn collection_histogram(rows: &[CategoryRow<&str>]) -> Histogram {
    categorical_histogram(&DATAWALLET_MODIFICATION_COLLECTIONS, rows)
}

// ============================================================================
// Device push channels
// ============================================================================

/// A device row: owning client and push-notification handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub client_id: String,
    pub pns_handle: Option<String>,
}

/// Device counts per client type and push channel.
pub fn device_type_counts(
    classifier: &ClientClassifier,
    mut devices: Vec<DeviceRecord>,
    hide_test_clients: bool,
) -> BTreeMap<ClientType, BTreeMap<DeviceType, u64>> {
    classifier.retain_visible(&mut devices, hide_test_clients, |d| d.client_id.as_str());
    let mut counts: BTreeMap<ClientType, BTreeMap<DeviceType, u64>> = BTreeMap::new();
    for device in &devices {
        let device_type = DeviceType::from_pns_handle(device.pns_handle.as_deref());
        *counts
            .entry(classifier.client_type(&device.client_id))
            .or_default()
            .entry(device_type)
            .or_default() += 1;
    }
    counts
}

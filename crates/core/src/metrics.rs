// crates/core/src/metrics.rs
//! Derived metrics and display formatting used by chart assembly.
//!
//! Ratios return `Option<f64>` so an undefined value (no limit, zero
//! denominator) stays distinguishable from a real zero.

/// Share of a relationship template's allocations that have been used.
///
/// Formula: num_allocations / max_allocations
///
/// Returns `None` when the template has no allocation limit (`None`) or a
/// limit of 0, which the backbone treats the same way.
pub fn allocation_usage_ratio(num_allocations: u64, max_allocations: Option<u64>) -> Option<f64> {
    match max_allocations {
        Some(max) if max > 0 => Some(num_allocations as f64 / max as f64),
        _ => None,
    }
}

/// Largest present value of a nullable column.
///
/// Returns `None` for an empty or all-null column; callers must not build a
/// bucket index without a maximum.
pub fn max_present<T, I>(values: I) -> Option<T>
where
    T: Ord,
    I: IntoIterator<Item = Option<T>>,
{
    values.into_iter().flatten().max()
}

/// Format an integer with `,` as thousands separator (e.g. `1,234,567`).
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Coarse human-readable rendering of a number of seconds.
///
/// - at least one day → whole days only (`"3d"`)
/// - at least one hour → hours and minutes (`"2h 5m"`)
/// - otherwise → minutes and seconds (`"4m 10s"`)
///
/// Zero parts are omitted; 0 renders as `"0s"`.
pub fn seconds_to_human_readable(seconds: u64) -> String {
    const DAY: u64 = 24 * 3600;
    let days = seconds / DAY;
    if days > 0 {
        return format!("{days}d");
    }
    let rest = seconds % DAY;
    let hours = rest / 3600;
    let minutes = (rest % 3600) / 60;
    let secs = rest % 60;

    let mut parts = Vec::with_capacity(2);
    if hours > 0 {
        parts.push(format!("{hours}h"));
        if minutes > 0 {
            parts.push(format!("{minutes}m"));
        }
    } else {
        if minutes > 0 {
            parts.push(format!("{minutes}m"));
        }
        if secs > 0 {
            parts.push(format!("{secs}s"));
        }
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Helper to round a share to 3 decimal places for display.
pub fn round_share(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// Tests
// ============================================================================

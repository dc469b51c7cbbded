//! Nearest-rank percentile helpers for latency samples.
//!
//! - Empty input => `None`, never zero: no data is not a zero-latency measurement.
//! - The Nth percentile of `n` sorted values sits at index `ceil(N/100 * n) - 1`,
//!   clamped to `[0, n-1]`.
//! - Averages keep full precision; rounding to whole milliseconds happens only in
//!   [`display_ms`].

use crate::domain::metrics::{LatencyStats, MetricsLog};

/// Returns the nearest-rank percentile from a slice that is already sorted in
/// ascending order.
pub fn value_sorted<T: Copy>(sorted_values: &[T], percentile: f64) -> Option<T> {
    if sorted_values.is_empty() {
        return None;
    }

    let count = sorted_values.len();
    // Multiply before dividing so integral percentiles stay exact.
    let rank = (percentile * count as f64 / 100.0).ceil();
    let index = if rank.is_nan() || rank <= 1.0 {
        0
    } else {
        (rank as usize - 1).min(count - 1)
    };

    sorted_values.get(index).copied()
}

/// Computes p50/p95/p99/avg over completed-delivery latencies in milliseconds.
pub fn aggregate(samples: &[f64]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let sum: f64 = sorted.iter().sum();

    LatencyStats {
        p50: value_sorted(&sorted, 50.0),
        p95: value_sorted(&sorted, 95.0),
        p99: value_sorted(&sorted, 99.0),
        avg: Some(sum / sorted.len() as f64),
    }
}

/// Latencies of logs that reached an acknowledged or delivered state.
pub fn completed_latencies(logs: &[MetricsLog]) -> Vec<f64> {
    logs.iter()
        .filter(|log| log.status.is_completed())
        .filter_map(|log| log.latency_ms)
        .collect()
}

/// Whole-millisecond rendering used everywhere a latency is shown.
pub fn display_ms(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.0}ms", value.round()),
        None => "N/A".to_string(),
    }
}

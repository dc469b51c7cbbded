use serde::Serialize;

use crate::domain::channel::Channel;
use crate::domain::metrics::ChannelMetrics;

/// Latency differences below this many milliseconds are reported as a tie.
pub const LATENCY_TIE_THRESHOLD_MS: f64 = 1.0;
/// Success-rate differences below this many percentage points are reported as a tie.
pub const SUCCESS_RATE_TIE_THRESHOLD_PP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    P50Latency,
    P95Latency,
    P99Latency,
    AvgLatency,
    SuccessRate,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::P50Latency,
        Metric::P95Latency,
        Metric::P99Latency,
        Metric::AvgLatency,
        Metric::SuccessRate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::P50Latency => "P50 latency",
            Metric::P95Latency => "P95 latency",
            Metric::P99Latency => "P99 latency",
            Metric::AvgLatency => "Average latency",
            Metric::SuccessRate => "Success rate",
        }
    }

    pub fn value(&self, metrics: &ChannelMetrics) -> Option<f64> {
        match self {
            Metric::P50Latency => metrics.p50_latency_ms,
            Metric::P95Latency => metrics.p95_latency_ms,
            Metric::P99Latency => metrics.p99_latency_ms,
            Metric::AvgLatency => metrics.avg_latency_ms,
            Metric::SuccessRate => metrics.success_rate,
        }
    }

    pub fn tie_threshold(&self) -> f64 {
        match self {
            Metric::SuccessRate => SUCCESS_RATE_TIE_THRESHOLD_PP,
            _ => LATENCY_TIE_THRESHOLD_MS,
        }
    }

    pub fn lower_is_better(&self) -> bool {
        !matches!(self, Metric::SuccessRate)
    }

    pub fn is_latency(&self) -> bool {
        !matches!(self, Metric::SuccessRate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Email,
    Telegram,
    Tie,
}

impl From<Channel> for Winner {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Email => Winner::Email,
            Channel::Telegram => Winner::Telegram,
        }
    }
}

/// Outcome of comparing one metric across two channels. All fields are `None` when
/// either side has no data for the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub winner: Option<Winner>,
    pub difference: Option<f64>,
    pub percentage_difference: Option<f64>,
}

/// Compares `metric` between `a` and `b`.
///
/// The percentage difference is always relative to `a`'s value, so callers must keep a
/// stable argument order (the console always passes EMAIL first). It is `None` when `a`'s
/// value is zero.
pub fn compare(
    a: &ChannelMetrics,
    b: &ChannelMetrics,
    metric: Metric,
    lower_is_better: bool,
) -> ComparisonResult {
    let (Some(value_a), Some(value_b)) = (metric.value(a), metric.value(b)) else {
        return ComparisonResult::default();
    };

    let delta = value_b - value_a;
    if delta.abs() < metric.tie_threshold() {
        return ComparisonResult {
            winner: Some(Winner::Tie),
            difference: Some(0.0),
            percentage_difference: Some(0.0),
        };
    }

    let a_wins = if lower_is_better {
        value_a < value_b
    } else {
        value_a > value_b
    };
    let winner = if a_wins { a.channel } else { b.channel };
    let percentage_difference = if value_a == 0.0 {
        None
    } else {
        Some(delta.abs() / value_a.abs() * 100.0)
    };

    ComparisonResult {
        winner: Some(winner.into()),
        difference: Some(delta.abs()),
        percentage_difference,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricComparison {
    pub metric: Metric,
    pub first_value: Option<f64>,
    pub second_value: Option<f64>,
    pub result: ComparisonResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelComparison {
    pub first: ChannelMetrics,
    pub second: ChannelMetrics,
    pub rows: Vec<MetricComparison>,
}

impl ChannelComparison {
    /// Number of metrics won outright by `channel`.
    pub fn wins(&self, channel: Channel) -> usize {
        let target = Winner::from(channel);
        self.rows
            .iter()
            .filter(|row| row.result.winner == Some(target))
            .count()
    }
}

/// Runs every metric through [`compare`] with its natural direction.
pub fn compare_channels(first: &ChannelMetrics, second: &ChannelMetrics) -> ChannelComparison {
    let rows = Metric::ALL
        .iter()
        .map(|metric| MetricComparison {
            metric: *metric,
            first_value: metric.value(first),
            second_value: metric.value(second),
            result: compare(first, second, *metric, metric.lower_is_better()),
        })
        .collect();

    ChannelComparison {
        first: first.clone(),
        second: second.clone(),
        rows,
    }
}

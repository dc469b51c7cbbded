use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::channel::Channel;

/// Delivery state of a single notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricStatus {
    Pending,
    Sent,
    Acked,
    Delivered,
    Failed,
}

impl MetricStatus {
    /// Only acknowledged or delivered events carry a meaningful latency.
    pub fn is_completed(&self) -> bool {
        matches!(self, MetricStatus::Acked | MetricStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Pending => "PENDING",
            MetricStatus::Sent => "SENT",
            MetricStatus::Acked => "ACKED",
            MetricStatus::Delivered => "DELIVERED",
            MetricStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(MetricStatus::Pending),
            "SENT" => Ok(MetricStatus::Sent),
            "ACKED" => Ok(MetricStatus::Acked),
            "DELIVERED" => Ok(MetricStatus::Delivered),
            "FAILED" => Ok(MetricStatus::Failed),
            _ => Err(format!("unknown delivery status '{value}'")),
        }
    }
}

/// p50/p95/p99/avg of a latency distribution. `None` means "no completed samples",
/// which is distinct from a measured zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub avg: Option<f64>,
}

impl LatencyStats {
    pub fn values(&self) -> [Option<f64>; 4] {
        [self.p50, self.p95, self.p99, self.avg]
    }
}

/// Aggregate for one channel within a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetrics {
    pub channel: Channel,
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub success_rate: Option<f64>,
    pub p50_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub p99_latency_ms: Option<f64>,
    pub avg_latency_ms: Option<f64>,
}

impl ChannelMetrics {
    /// Builds a channel aggregate with the success rate derived from the counts.
    pub fn new(channel: Channel, total_sent: u64, total_delivered: u64, total_failed: u64) -> Self {
        Self {
            channel,
            total_sent,
            total_delivered,
            total_failed,
            success_rate: success_rate(total_sent, total_delivered),
            p50_latency_ms: None,
            p95_latency_ms: None,
            p99_latency_ms: None,
            avg_latency_ms: None,
        }
    }

    pub fn with_latency(mut self, stats: LatencyStats) -> Self {
        self.p50_latency_ms = stats.p50;
        self.p95_latency_ms = stats.p95;
        self.p99_latency_ms = stats.p99;
        self.avg_latency_ms = stats.avg;
        self
    }
}

/// `delivered / sent * 100`, undefined when nothing was sent.
pub fn success_rate(total_sent: u64, total_delivered: u64) -> Option<f64> {
    if total_sent == 0 {
        None
    } else {
        Some(total_delivered as f64 / total_sent as f64 * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub channel: Channel,
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub p95_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub p50_latency_ms: Option<f64>,
    #[serde(default)]
    pub p95_latency_ms: Option<f64>,
    #[serde(default)]
    pub p99_latency_ms: Option<f64>,
    #[serde(default)]
    pub avg_latency_ms: Option<f64>,
    #[serde(default)]
    pub by_channel: Vec<ChannelSummary>,
}

impl MetricsSummary {
    /// Assembles the comparable aggregate for `channel`: counts come from the summary row,
    /// percentiles from the latency breakdown when it has a row for the channel.
    pub fn channel_metrics(
        &self,
        channel: Channel,
        latency: Option<&MetricsLatency>,
    ) -> Option<ChannelMetrics> {
        let row = self.by_channel.iter().find(|row| row.channel == channel)?;
        let metrics = ChannelMetrics::new(
            channel,
            row.total_sent,
            row.total_delivered,
            row.total_failed,
        );
        let stats = latency
            .and_then(|latency| latency.channel_stats(channel))
            .unwrap_or(LatencyStats {
                p95: row.p95_latency_ms,
                ..LatencyStats::default()
            });
        Some(metrics.with_latency(stats))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLatencyPoint {
    pub timestamp: DateTime<Utc>,
    pub channel: Channel,
    pub p95: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLatency {
    pub channel: Channel,
    #[serde(flatten)]
    pub stats: LatencyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsLatency {
    #[serde(default)]
    pub series: Vec<LatencySeriesPoint>,
    #[serde(default)]
    pub series_by_channel: Vec<ChannelLatencyPoint>,
    pub overall: LatencyStats,
    #[serde(default)]
    pub by_channel: Vec<ChannelLatency>,
}

impl MetricsLatency {
    pub fn channel_stats(&self, channel: Channel) -> Option<LatencyStats> {
        self.by_channel
            .iter()
            .find(|row| row.channel == channel)
            .map(|row| row.stats)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsLog {
    pub id: String,
    pub channel: Channel,
    #[serde(default)]
    pub template: Option<String>,
    pub recipient_hash: String,
    pub correlation_id: String,
    pub status: MetricStatus,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub provider_ack_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub retry_count: u32,
    #[serde(default)]
    pub experiment_run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsLogsPage {
    pub data: Vec<MetricsLog>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputPoint {
    pub t_offset_sec: f64,
    pub sent_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub throughput: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_row(channel: Channel, sent: u64, delivered: u64, p95: Option<f64>) -> ChannelSummary {
        ChannelSummary {
            channel,
            total_sent: sent,
            total_delivered: delivered,
            total_failed: sent - delivered,
            success_rate: None,
            p95_latency_ms: p95,
        }
    }

    #[test]
    fn success_rate_is_undefined_without_sends() {
        assert_eq!(success_rate(0, 0), None);
        assert_eq!(success_rate(4, 3), Some(75.0));
    }

    #[test]
    fn channel_metrics_prefers_latency_breakdown() {
        let summary = MetricsSummary {
            total_sent: 10,
            total_delivered: 9,
            total_failed: 1,
            success_rate: Some(90.0),
            p50_latency_ms: None,
            p95_latency_ms: None,
            p99_latency_ms: None,
            avg_latency_ms: None,
            by_channel: vec![summary_row(Channel::Email, 10, 9, Some(300.0))],
        };
        let latency = MetricsLatency {
            series: vec![],
            series_by_channel: vec![],
            overall: LatencyStats::default(),
            by_channel: vec![ChannelLatency {
                channel: Channel::Email,
                stats: LatencyStats {
                    p50: Some(100.0),
                    p95: Some(250.0),
                    p99: Some(400.0),
                    avg: Some(130.0),
                },
            }],
        };

        let metrics = summary.channel_metrics(Channel::Email, Some(&latency)).unwrap();
        assert_eq!(metrics.success_rate, Some(90.0));
        assert_eq!(metrics.p50_latency_ms, Some(100.0));
        assert_eq!(metrics.p95_latency_ms, Some(250.0));

        let fallback = summary.channel_metrics(Channel::Email, None).unwrap();
        assert_eq!(fallback.p95_latency_ms, Some(300.0));
        assert_eq!(fallback.p50_latency_ms, None);

        assert!(summary.channel_metrics(Channel::Telegram, Some(&latency)).is_none());
    }

    #[test]
    fn channel_latency_flattens_stats() {
        let row: ChannelLatency = serde_json::from_value(serde_json::json!({
            "channel": "TELEGRAM",
            "p50": 12.0,
            "p95": null,
            "p99": null,
            "avg": 15.5
        }))
        .unwrap();
        assert_eq!(row.stats.p50, Some(12.0));
        assert_eq!(row.stats.p95, None);
        assert_eq!(row.stats.avg, Some(15.5));
    }
}

//! Shape checks applied to every decoded API response before it reaches the engine.

use crate::domain::economic::EconomicImpactDefaults;
use crate::domain::experiment::{ActionAck, ExperimentRun};
use crate::domain::hearing::Hearing;
use crate::domain::metrics::{
    ChannelSummary, LatencyStats, MetricsLatency, MetricsLogsPage, MetricsSummary, ThroughputPoint,
};
use crate::services::data_source::ApiError;

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ApiError> {
        self.iter().try_for_each(Validate::validate)
    }
}

fn schema(message: String) -> Result<(), ApiError> {
    Err(ApiError::Schema(message))
}

fn check_latency(field: &str, value: Option<f64>) -> Result<(), ApiError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            schema(format!("{field} must be a non-negative number, got {value}"))
        }
        _ => Ok(()),
    }
}

fn check_counts(scope: &str, sent: u64, delivered: u64, failed: u64) -> Result<(), ApiError> {
    if delivered.saturating_add(failed) > sent {
        return schema(format!(
            "{scope}: totalDelivered ({delivered}) + totalFailed ({failed}) exceeds totalSent ({sent})"
        ));
    }
    Ok(())
}

fn check_rate(scope: &str, rate: Option<f64>) -> Result<(), ApiError> {
    match rate {
        Some(rate) if !(0.0..=100.0).contains(&rate) => {
            schema(format!("{scope}: successRate {rate} is outside 0..=100"))
        }
        _ => Ok(()),
    }
}

fn check_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return schema(format!("{field} must not be empty"));
    }
    Ok(())
}

impl Validate for LatencyStats {
    fn validate(&self) -> Result<(), ApiError> {
        check_latency("p50", self.p50)?;
        check_latency("p95", self.p95)?;
        check_latency("p99", self.p99)?;
        check_latency("avg", self.avg)
    }
}

impl Validate for ChannelSummary {
    fn validate(&self) -> Result<(), ApiError> {
        let scope = format!("byChannel[{}]", self.channel);
        check_counts(&scope, self.total_sent, self.total_delivered, self.total_failed)?;
        check_rate(&scope, self.success_rate)?;
        check_latency("byChannel.p95LatencyMs", self.p95_latency_ms)
    }
}

impl Validate for MetricsSummary {
    fn validate(&self) -> Result<(), ApiError> {
        check_counts("summary", self.total_sent, self.total_delivered, self.total_failed)?;
        check_rate("summary", self.success_rate)?;
        check_latency("p50LatencyMs", self.p50_latency_ms)?;
        check_latency("p95LatencyMs", self.p95_latency_ms)?;
        check_latency("p99LatencyMs", self.p99_latency_ms)?;
        check_latency("avgLatencyMs", self.avg_latency_ms)?;
        self.by_channel.validate()
    }
}

impl Validate for MetricsLatency {
    fn validate(&self) -> Result<(), ApiError> {
        self.overall.validate()?;
        for point in &self.series {
            check_latency("series.p50", point.p50)?;
            check_latency("series.p95", point.p95)?;
            check_latency("series.p99", point.p99)?;
            check_latency("series.avg", point.avg)?;
        }
        for point in &self.series_by_channel {
            check_latency("seriesByChannel.p95", point.p95)?;
        }
        for row in &self.by_channel {
            row.stats.validate()?;
        }
        Ok(())
    }
}

impl Validate for MetricsLogsPage {
    fn validate(&self) -> Result<(), ApiError> {
        if self.page == 0 {
            return schema("page must be at least 1".to_string());
        }
        for log in &self.data {
            check_non_empty("logs.id", &log.id)?;
            check_latency("logs.latencyMs", log.latency_ms)?;
        }
        Ok(())
    }
}

impl Validate for ExperimentRun {
    fn validate(&self) -> Result<(), ApiError> {
        check_non_empty("experiment.id", &self.id)?;
        for point in &self.series_points {
            if point.success_count.saturating_add(point.fail_count) > point.sent_count {
                return schema(format!(
                    "seriesPoints[{}]: successCount + failCount exceeds sentCount",
                    point.id
                ));
            }
            check_latency("seriesPoints.p95LatencyMs", point.p95_latency_ms)?;
        }
        Ok(())
    }
}

impl Validate for ThroughputPoint {
    fn validate(&self) -> Result<(), ApiError> {
        if self.success_count.saturating_add(self.fail_count) > self.sent_count {
            return schema(format!(
                "throughput at {}s: successCount + failCount exceeds sentCount",
                self.t_offset_sec
            ));
        }
        Ok(())
    }
}

impl Validate for ActionAck {
    fn validate(&self) -> Result<(), ApiError> {
        check_non_empty("id", &self.id)
    }
}

impl Validate for Hearing {
    fn validate(&self) -> Result<(), ApiError> {
        check_non_empty("juicio.id", &self.id)
    }
}

impl Validate for EconomicImpactDefaults {
    fn validate(&self) -> Result<(), ApiError> {
        if !self.average_cost_per_hearing.is_finite() || self.average_cost_per_hearing < 0.0 {
            return schema("averageCostPerHearing must be non-negative".to_string());
        }
        let scenarios = self.reduction_scenarios;
        for value in [
            scenarios.very_conservative,
            scenarios.medium_conservative,
            scenarios.moderately_conservative,
        ] {
            if !(0.0..=100.0).contains(&value) {
                return schema(format!("reduction scenario {value} is outside 0..=100"));
            }
        }
        Ok(())
    }
}

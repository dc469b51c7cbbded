use crate::domain::economic::{EconomicImpactInputs, EconomicImpactResult, Scenario};
use crate::domain::experiment::ExperimentRun;
use crate::domain::hearing::Hearing;
use crate::domain::metrics::{LatencyStats, MetricsLatency, MetricsLogsPage, MetricsSummary, ThroughputPoint};
use crate::services::comparator::{ChannelComparison, Metric, MetricComparison, Winner};
use crate::services::percentiles::display_ms;
use crate::services::series_merge::MergedRow;

fn display_rate(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}%"),
        None => "N/A".to_string(),
    }
}

fn display_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_stats_row(label: &str, stats: &LatencyStats) -> String {
    format!(
        "{label} | {} | {} | {} | {}",
        display_ms(stats.p50),
        display_ms(stats.p95),
        display_ms(stats.p99),
        display_ms(stats.avg)
    )
}

pub fn format_summary(summary: &MetricsSummary) -> String {
    let mut lines = Vec::new();
    lines.push("Delivery Summary".to_string());
    lines.push(format!("Sent: {}", summary.total_sent));
    lines.push(format!("Delivered: {}", summary.total_delivered));
    lines.push(format!("Failed: {}", summary.total_failed));
    lines.push(format!("Success rate: {}", display_rate(summary.success_rate)));
    lines.push(format!("P95 latency: {}", display_ms(summary.p95_latency_ms)));
    lines.push(String::new());
    lines.push("Channel | Sent | Delivered | Failed | Success rate | P95".to_string());
    lines.push("--------|------|-----------|--------|--------------|----".to_string());
    for row in &summary.by_channel {
        lines.push(format!(
            "{} | {} | {} | {} | {} | {}",
            row.channel,
            row.total_sent,
            row.total_delivered,
            row.total_failed,
            display_rate(row.success_rate),
            display_ms(row.p95_latency_ms)
        ));
    }
    lines.join("\n")
}

pub fn format_latency(latency: &MetricsLatency, merged: &[MergedRow]) -> String {
    let mut lines = Vec::new();
    lines.push("Latency Percentiles".to_string());
    lines.push("Scope | P50 | P95 | P99 | Avg".to_string());
    lines.push("------|-----|-----|-----|----".to_string());
    lines.push(format_stats_row("ALL", &latency.overall));
    for row in &latency.by_channel {
        lines.push(format_stats_row(row.channel.as_str(), &row.stats));
    }
    lines.push(String::new());
    lines.push("P95 by channel over time:".to_string());
    if merged.is_empty() {
        lines.push("(no data points)".to_string());
        return lines.join("\n");
    }
    lines.push("Timestamp | EMAIL | TELEGRAM".to_string());
    lines.push("----------|-------|---------".to_string());
    for row in merged {
        lines.push(format!(
            "{} | {} | {}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            display_ms(row.value_a),
            display_ms(row.value_b)
        ));
    }
    lines.join("\n")
}

fn display_metric_value(metric: Metric, value: Option<f64>) -> String {
    if metric.is_latency() {
        display_ms(value)
    } else {
        display_rate(value)
    }
}

fn display_winner(winner: Option<Winner>) -> &'static str {
    match winner {
        Some(Winner::Email) => "EMAIL",
        Some(Winner::Telegram) => "TELEGRAM",
        Some(Winner::Tie) => "TIE",
        None => "no data",
    }
}

fn format_comparison_row(row: &MetricComparison) -> String {
    let difference = match row.result.difference {
        Some(value) if row.metric.is_latency() => display_ms(Some(value)),
        Some(value) => format!("{value:.2} pp"),
        None => "N/A".to_string(),
    };
    let percentage = match row.result.percentage_difference {
        Some(value) => format!("{value:.1}%"),
        None => "N/A".to_string(),
    };
    format!(
        "{} | {} | {} | {} | {} | {}",
        row.metric.label(),
        display_metric_value(row.metric, row.first_value),
        display_metric_value(row.metric, row.second_value),
        display_winner(row.result.winner),
        difference,
        percentage
    )
}

pub fn format_comparison(comparison: Option<&ChannelComparison>) -> String {
    let Some(comparison) = comparison else {
        return "Channel Comparison\nBoth EMAIL and TELEGRAM data are required to compare channels."
            .to_string();
    };

    let mut lines = Vec::new();
    lines.push("Channel Comparison".to_string());
    lines.push(format!(
        "{first} sent {} ({} delivered), {second} sent {} ({} delivered)",
        comparison.first.total_sent,
        comparison.first.total_delivered,
        comparison.second.total_sent,
        comparison.second.total_delivered,
        first = comparison.first.channel,
        second = comparison.second.channel,
    ));
    lines.push(String::new());
    lines.push(format!(
        "Metric | {} | {} | Winner | Difference | % Difference",
        comparison.first.channel, comparison.second.channel
    ));
    lines.push("-------|-------|----------|--------|------------|-------------".to_string());
    for row in &comparison.rows {
        lines.push(format_comparison_row(row));
    }
    lines.push(String::new());
    lines.push(format!(
        "Metrics won: {} {}, {} {}",
        comparison.first.channel,
        comparison.wins(comparison.first.channel),
        comparison.second.channel,
        comparison.wins(comparison.second.channel)
    ));
    lines.push(format!(
        "% difference is relative to {}.",
        comparison.first.channel
    ));
    lines.join("\n")
}

pub fn format_logs_page(page: &MetricsLogsPage) -> String {
    let pages = page.total.div_ceil(u64::from(page.page_size.max(1))).max(1);
    let mut lines = Vec::new();
    lines.push(format!(
        "Delivery Logs (page {} of {pages}, {} total)",
        page.page, page.total
    ));
    lines.push("Created | Channel | Status | Latency | Retries | Correlation ID | Error".to_string());
    lines.push("--------|---------|--------|---------|---------|----------------|------".to_string());
    for log in &page.data {
        lines.push(format!(
            "{} | {} | {} | {} | {} | {} | {}",
            log.created_at.format("%Y-%m-%d %H:%M:%S"),
            log.channel,
            log.status,
            display_ms(log.latency_ms),
            log.retry_count,
            log.correlation_id,
            display_opt(log.error_message.as_deref())
        ));
    }
    lines.join("\n")
}

pub fn format_experiment_list(runs: &[ExperimentRun]) -> String {
    if runs.is_empty() {
        return "No experiments found.".to_string();
    }
    let mut lines = Vec::new();
    lines.push("ID | Name | Scenario | Channel | Messages | Status | Created".to_string());
    lines.push("---|------|----------|---------|----------|--------|--------".to_string());
    for run in runs {
        lines.push(format!(
            "{} | {} | {} | {} | {} | {} | {}",
            run.id,
            run.name,
            run.scenario,
            run.channel_target,
            run.total_messages,
            run.status,
            run.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    lines.join("\n")
}

pub fn format_experiment(run: &ExperimentRun) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Experiment {} ({})", run.name, run.id));
    if let Some(description) = run.description.as_deref().filter(|text| !text.is_empty()) {
        lines.push(format!("Description: {description}"));
    }
    lines.push(format!("Status: {}", run.status));
    lines.push(format!("Scenario: {}", run.scenario));
    lines.push(format!("Channel: {}", run.channel_target));
    lines.push(format!("Messages: {}", run.total_messages));
    lines.push(format!("Concurrency: {}", run.concurrency));
    lines.push(format!("Rate per second: {}", display_opt(run.rate_per_sec)));
    lines.push(format!("Started: {}", display_opt(run.started_at)));
    lines.push(format!("Finished: {}", display_opt(run.finished_at)));

    if let Some(summary) = &run.summary_json {
        lines.push(String::new());
        lines.push("Summary:".to_string());
        match summary.as_object() {
            Some(fields) => {
                for (key, value) in fields {
                    lines.push(format!("  {key}: {value}"));
                }
            }
            None => lines.push(format!("  {summary}")),
        }
    }

    if !run.series_points.is_empty() {
        lines.push(String::new());
        lines.push("Offset (s) | Sent | Success | Failed | P95".to_string());
        lines.push("-----------|------|---------|--------|----".to_string());
        for point in &run.series_points {
            lines.push(format!(
                "{} | {} | {} | {} | {}",
                point.t_offset_sec,
                point.sent_count,
                point.success_count,
                point.fail_count,
                display_ms(point.p95_latency_ms)
            ));
        }
    }
    lines.join("\n")
}

pub fn format_throughput(points: &[ThroughputPoint]) -> String {
    if points.is_empty() {
        return "No throughput data recorded.".to_string();
    }
    let mut lines = Vec::new();
    lines.push("Offset (s) | Sent | Success | Failed | Msg/s".to_string());
    lines.push("-----------|------|---------|--------|------".to_string());
    for point in points {
        lines.push(format!(
            "{} | {} | {} | {} | {:.2}",
            point.t_offset_sec, point.sent_count, point.success_count, point.fail_count, point.throughput
        ));
    }
    lines.join("\n")
}

fn format_result_row(label: &str, result: &EconomicImpactResult) -> String {
    format!(
        "{label} | {}% | {} | {:.2}",
        result.reduction_percentage, result.avoided_cancellations, result.estimated_annual_savings
    )
}

pub fn format_economic_report(
    inputs: &EconomicImpactInputs,
    current: &EconomicImpactResult,
    scenarios: &[Scenario],
    projection: &[EconomicImpactResult],
) -> String {
    let mut lines = Vec::new();
    lines.push("Economic Impact Estimate".to_string());
    lines.push(format!("Failed hearings per year: {}", inputs.annual_failed_hearings));
    lines.push(format!("Average cost per hearing: {:.2}", inputs.average_cost_per_hearing));
    lines.push(format!("Reduction: {}%", inputs.reduction_percentage));
    lines.push(format!("Avoided cancellations: {}", current.avoided_cancellations));
    lines.push(format!("Estimated annual savings: {:.2}", current.estimated_annual_savings));

    if !scenarios.is_empty() {
        lines.push(String::new());
        lines.push("Scenario | Reduction | Avoided | Savings".to_string());
        lines.push("---------|-----------|---------|--------".to_string());
        for scenario in scenarios {
            lines.push(format_result_row(&scenario.name, &scenario.result));
        }
    }

    lines.push(String::new());
    lines.push("Projection:".to_string());
    lines.push("Reduction | Avoided | Savings".to_string());
    lines.push("----------|---------|--------".to_string());
    for point in projection {
        lines.push(format!(
            "{}% | {} | {:.2}",
            point.reduction_percentage, point.avoided_cancellations, point.estimated_annual_savings
        ));
    }
    lines.join("\n")
}

pub fn format_hearing(hearing: &Hearing) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Hearing {} (case {})", hearing.id, hearing.case_number));
    lines.push(format!("Type: {}", hearing.hearing_type));
    lines.push(format!("When: {} {}", hearing.date, hearing.time));
    lines.push(format!("Room: {}", hearing.room));
    lines.push(format!("Status: {}", hearing.status));
    if let Some(description) = hearing.description.as_deref().filter(|text| !text.is_empty()) {
        lines.push(format!("Description: {description}"));
    }
    lines.join("\n")
}

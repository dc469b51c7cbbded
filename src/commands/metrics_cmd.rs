use std::path::Path;

use crate::commands::base_commands::FilterArgs;
use crate::commands::console::{CommandError, Console};
use crate::commands::report_format::{
    format_comparison, format_latency, format_logs_page, format_summary,
};
use crate::domain::channel::Channel;
use crate::domain::metrics::{MetricStatus, MetricsLatency, MetricsSummary};
use crate::services::comparator::{ChannelComparison, compare_channels};
use crate::services::export::{to_delimited_text, write_export};
use crate::services::latency_plot::write_latency_plot_png;
use crate::services::query_filters::LogsQuery;
use crate::services::series_merge::{MergedRow, merge_channel_points};

/// EMAIL on the A side, TELEGRAM on the B side.
pub fn merged_channel_series(latency: &MetricsLatency) -> Vec<MergedRow> {
    merge_channel_points(&latency.series_by_channel, Channel::Email, Channel::Telegram)
}

/// EMAIL versus TELEGRAM, or `None` unless both channels reported.
pub fn channel_comparison(
    summary: &MetricsSummary,
    latency: &MetricsLatency,
) -> Option<ChannelComparison> {
    let email = summary.channel_metrics(Channel::Email, Some(latency))?;
    let telegram = summary.channel_metrics(Channel::Telegram, Some(latency))?;
    Some(compare_channels(&email, &telegram))
}

pub async fn summary_command(console: &Console, filters: &FilterArgs) -> Result<(), CommandError> {
    let summary = console.client.get_summary(&filters.to_filter()).await?;
    println!("{}", format_summary(&summary));
    Ok(())
}

pub async fn latency_command(
    console: &Console,
    filters: &FilterArgs,
    csv: Option<&str>,
) -> Result<(), CommandError> {
    let latency = console.client.get_latency(&filters.to_filter()).await?;
    let merged = merged_channel_series(&latency);
    println!("{}", format_latency(&latency, &merged));

    if let Some(path) = csv {
        let text = to_delimited_text(&merged)?;
        write_export(Path::new(path), &text)?;
        println!("Latency series written to {path}");
    }
    Ok(())
}

pub async fn compare_command(console: &Console, filters: &FilterArgs) -> Result<(), CommandError> {
    let filter = filters.to_filter();
    let (summary, latency) = tokio::try_join!(
        console.client.get_summary(&filter),
        console.client.get_latency(&filter)
    )?;
    let comparison = channel_comparison(&summary, &latency);
    println!("{}", format_comparison(comparison.as_ref()));
    Ok(())
}

pub async fn plot_latency_command(
    console: &Console,
    filters: &FilterArgs,
    output: &str,
) -> Result<(), CommandError> {
    let latency = console.client.get_latency(&filters.to_filter()).await?;
    let merged = merged_channel_series(&latency);
    write_latency_plot_png(output, &merged).await?;
    println!("Latency plot written to {output}");
    Ok(())
}

pub async fn logs_command(
    console: &Console,
    filters: &FilterArgs,
    status: Option<MetricStatus>,
    search: Option<String>,
    page: u32,
    page_size: u32,
) -> Result<(), CommandError> {
    let mut query = LogsQuery::new(filters.to_filter(), page, page_size);
    query.status = status;
    query.search = search;
    let logs = console.client.get_logs(&query).await?;
    println!("{}", format_logs_page(&logs));
    Ok(())
}

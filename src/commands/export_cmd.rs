use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::commands::base_commands::FilterArgs;
use crate::commands::console::{CommandError, Console};
use crate::domain::metrics::MetricsLogsPage;
use crate::services::export::{
    ExportDocument, ExportError, ExportFormat, SnapshotDocument, resolve_output_path,
    to_delimited_text, to_structured_document, write_export,
};
use crate::services::query_filters::{LogsQuery, MetricsFilter};

/// Renders a page of logs in the requested format. An empty page is refused so that no
/// header-only or data-less file is ever produced.
pub fn render_logs_export(
    page: &MetricsLogsPage,
    filter: &MetricsFilter,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    if page.data.is_empty() {
        return Err(ExportError::Empty);
    }
    match format {
        ExportFormat::Csv => to_delimited_text(&page.data),
        ExportFormat::Json => to_structured_document(&ExportDocument::new(
            exported_at,
            filter.clone(),
            page.total,
            &page.data,
        )),
    }
}

pub async fn export_logs_command(
    console: &Console,
    filters: &FilterArgs,
    format: ExportFormat,
    output: &str,
) -> Result<(), CommandError> {
    let filter = filters.to_filter();
    let query = LogsQuery::new(filter.clone(), 1, console.config.export_page_size);
    let page = console.client.get_logs(&query).await?;

    let now = Utc::now();
    let contents = render_logs_export(&page, &filter, format, now)?;
    if page.total > page.data.len() as u64 {
        warn!(
            total = page.total,
            exported = page.data.len(),
            "more logs match than fit in one export page"
        );
    }

    let path = resolve_output_path(Path::new(output), "metrics-logs", now, format);
    write_export(&path, &contents)?;
    println!(
        "Exported {} of {} logs to {}",
        page.data.len(),
        page.total,
        path.display()
    );
    Ok(())
}

pub async fn snapshot_command(
    console: &Console,
    filters: &FilterArgs,
    output: &str,
) -> Result<(), CommandError> {
    let filter = filters.to_filter();
    let logs_query = LogsQuery::new(filter.clone(), 1, console.config.snapshot_page_size);
    let run_id = filter
        .experiment_run_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let throughput = async {
        let run_id = run_id?;
        match console.client.get_throughput(run_id).await {
            Ok(points) => Some(points),
            Err(err) => {
                warn!(%err, run_id, "throughput unavailable, snapshot written without it");
                None
            }
        }
    };

    let (summary, latency, logs, throughput) = tokio::join!(
        console.client.get_summary(&filter),
        console.client.get_latency(&filter),
        console.client.get_logs(&logs_query),
        throughput
    );

    let now = Utc::now();
    let document = SnapshotDocument::new(now, &filter, summary?, latency?, logs?, throughput);
    let path = resolve_output_path(Path::new(output), "metrics-snapshot", now, ExportFormat::Json);
    write_export(&path, &to_structured_document(&document)?)?;
    println!("Snapshot written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::MetricStatus;
    use crate::test_support::{at_second, build_log};

    #[test]
    fn empty_page_is_not_exported() {
        let page = MetricsLogsPage {
            data: vec![],
            total: 0,
            page: 1,
            page_size: 10_000,
        };
        for format in [ExportFormat::Csv, ExportFormat::Json] {
            let result = render_logs_export(&page, &MetricsFilter::default(), format, at_second(0));
            assert!(matches!(result, Err(ExportError::Empty)));
        }
    }

    #[test]
    fn json_export_counts_records() {
        let page = MetricsLogsPage {
            data: vec![
                build_log("1", MetricStatus::Delivered, Some(10.0)),
                build_log("2", MetricStatus::Failed, None),
            ],
            total: 2,
            page: 1,
            page_size: 10_000,
        };
        let text =
            render_logs_export(&page, &MetricsFilter::default(), ExportFormat::Json, at_second(0))
                .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["metadata"]["exportedRecords"], 2);
        assert_eq!(parsed["data"].as_array().map(Vec::len), Some(2));
    }
}

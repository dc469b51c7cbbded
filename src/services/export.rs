//! Delimited-text and structured-document exports.
//!
//! Both formats are byte-stable for identical input: rows are written in the order given,
//! structs serialize in declaration order and free-form maps are `serde_json::Value`
//! objects, which keep their keys sorted. Export timestamps are always passed in.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::economic::{EconomicImpactInputs, EconomicImpactResult, Scenario};
use crate::domain::metrics::{
    MetricsLatency, MetricsLog, MetricsLogsPage, MetricsSummary, ThroughputPoint,
};
use crate::services::query_filters::MetricsFilter;
use crate::services::series_merge::MergedRow;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no records match the applied filters, nothing was exported")]
    Empty,
    #[error("failed to write delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row type that can be written as delimited text.
pub trait DelimitedRecord {
    fn header() -> Vec<String>;
    fn fields(&self) -> Vec<String>;
}

/// Header row first, then one record per row. Fields containing the delimiter, quotes or
/// line breaks are quoted with embedded quotes doubled.
pub fn to_delimited_text<R: DelimitedRecord>(rows: &[R]) -> Result<String, ExportError> {
    write_records(
        std::iter::once(R::header()).chain(rows.iter().map(DelimitedRecord::fields)),
    )
}

/// Re-reads a delimited blob produced elsewhere and writes it back with proper escaping.
/// A blob with nothing beyond its header row is `ExportError::Empty`.
pub fn reformat_delimited(raw: &str) -> Result<String, ExportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if records.len() <= 1 {
        return Err(ExportError::Empty);
    }
    write_records(records)
}

fn write_records<I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(Vec::new());
    for record in records {
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Pretty-printed (two-space indented) serialization of `payload`.
pub fn to_structured_document<T: Serialize + ?Sized>(payload: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(payload)?)
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

fn optional_text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl DelimitedRecord for MetricsLog {
    fn header() -> Vec<String> {
        [
            "ID",
            "Created At",
            "Channel",
            "Status",
            "Latency (ms)",
            "Correlation ID",
            "Retries",
            "Error Code",
            "Error Message",
            "Template",
            "Recipient Hash",
            "Experiment Run ID",
        ]
        .iter()
        .map(|name| name.to_string())
        .collect()
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            format_timestamp(self.created_at),
            self.channel.to_string(),
            self.status.to_string(),
            // A measured zero stays "0"; only a missing latency is blank.
            optional_number(self.latency_ms),
            self.correlation_id.clone(),
            self.retry_count.to_string(),
            optional_text(self.error_code.as_deref()),
            optional_text(self.error_message.as_deref()),
            optional_text(self.template.as_deref()),
            self.recipient_hash.clone(),
            optional_text(self.experiment_run_id.as_deref()),
        ]
    }
}

/// EMAIL sits on the A side and TELEGRAM on the B side of the merged table.
impl DelimitedRecord for MergedRow {
    fn header() -> Vec<String> {
        vec![
            "Timestamp".to_string(),
            "EMAIL p95 (ms)".to_string(),
            "TELEGRAM p95 (ms)".to_string(),
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            format_timestamp(self.timestamp),
            optional_number(self.value_a),
            optional_number(self.value_b),
        ]
    }
}

impl DelimitedRecord for Scenario {
    fn header() -> Vec<String> {
        vec![
            "Scenario".to_string(),
            "Reduction (%)".to_string(),
            "Avoided Cancellations".to_string(),
            "Annual Savings (USD)".to_string(),
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            format!("{}%", self.result.reduction_percentage),
            self.result.avoided_cancellations.to_string(),
            format!("{:.2}", self.result.estimated_annual_savings),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: String,
    pub filters: MetricsFilter,
    pub total_records: u64,
    pub exported_records: usize,
}

/// Self-describing export: the metadata envelope followed by the records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument<'a, T: Serialize> {
    pub metadata: ExportMetadata,
    pub data: &'a [T],
}

impl<'a, T: Serialize> ExportDocument<'a, T> {
    pub fn new(
        exported_at: DateTime<Utc>,
        filters: MetricsFilter,
        total_records: u64,
        data: &'a [T],
    ) -> Self {
        Self {
            metadata: ExportMetadata {
                exported_at: format_timestamp(exported_at),
                filters,
                total_records,
                exported_records: data.len(),
            },
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentExportMetadata {
    pub exported_at: String,
    pub experiment_id: String,
}

/// Server-provided experiment export wrapped with local metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentExport {
    pub metadata: ExperimentExportMetadata,
    pub data: Value,
}

impl ExperimentExport {
    pub fn from_raw(
        exported_at: DateTime<Utc>,
        experiment_id: &str,
        raw: &str,
    ) -> Result<Self, ExportError> {
        if raw.trim().is_empty() {
            return Err(ExportError::Empty);
        }
        let data: Value = serde_json::from_str(raw)?;
        let empty = match &data {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            _ => false,
        };
        if empty {
            return Err(ExportError::Empty);
        }
        Ok(Self {
            metadata: ExperimentExportMetadata {
                exported_at: format_timestamp(exported_at),
                experiment_id: experiment_id.to_string(),
            },
            data,
        })
    }
}

/// Economic-impact report: the inputs, the current estimate and the named scenarios.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicImpactExport {
    pub timestamp: String,
    pub inputs: EconomicImpactInputs,
    pub current_result: EconomicImpactResult,
    pub scenarios: Vec<Scenario>,
}

impl EconomicImpactExport {
    pub fn new(
        generated_at: DateTime<Utc>,
        inputs: EconomicImpactInputs,
        current_result: EconomicImpactResult,
        scenarios: Vec<Scenario>,
    ) -> Self {
        Self {
            timestamp: format_timestamp(generated_at),
            inputs,
            current_result,
            scenarios,
        }
    }

    /// Scenario table, current estimate, inputs and timestamp as blank-line separated blocks.
    pub fn to_delimited_text(&self) -> Result<String, ExportError> {
        let current = Scenario {
            name: "Current estimate".to_string(),
            result: self.current_result,
        };
        let blocks = [
            to_delimited_text(&self.scenarios)?,
            write_records([current.fields()])?,
            write_records([
                vec!["Inputs".to_string()],
                vec![
                    "Annual failed hearings".to_string(),
                    self.inputs.annual_failed_hearings.to_string(),
                ],
                vec![
                    "Average cost per hearing (USD)".to_string(),
                    self.inputs.average_cost_per_hearing.to_string(),
                ],
                vec![
                    "Reduction (%)".to_string(),
                    format!("{}%", self.inputs.reduction_percentage),
                ],
            ])?,
            write_records([vec!["Timestamp".to_string(), self.timestamp.clone()]])?,
        ];
        Ok(blocks.join("\n"))
    }
}

const NOT_SPECIFIED: &str = "not specified";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFilters {
    pub from: String,
    pub to: String,
    pub channel: String,
    pub experiment_run_id: String,
}

impl From<&MetricsFilter> for SnapshotFilters {
    fn from(filter: &MetricsFilter) -> Self {
        let or_placeholder = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or(NOT_SPECIFIED)
                .to_string()
        };
        Self {
            from: or_placeholder(filter.from.as_deref()),
            to: or_placeholder(filter.to.as_deref()),
            channel: filter
                .channel
                .and_then(|target| target.channel())
                .map(|channel| channel.to_string())
                .unwrap_or_else(|| "all".to_string()),
            experiment_run_id: or_placeholder(filter.experiment_run_id.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCounts {
    pub total_logs: u64,
    pub logs_in_snapshot: usize,
    pub latency_data_points: usize,
    pub has_throughput: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub generated_at: String,
    pub filters: SnapshotFilters,
    pub data_counts: DataCounts,
}

/// Evidence document bundling every view of the metrics for one filter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDocument {
    pub metadata: SnapshotMetadata,
    pub summary: MetricsSummary,
    pub latency: MetricsLatency,
    pub logs: MetricsLogsPage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<Vec<ThroughputPoint>>,
}

impl SnapshotDocument {
    pub fn new(
        generated_at: DateTime<Utc>,
        filter: &MetricsFilter,
        summary: MetricsSummary,
        latency: MetricsLatency,
        logs: MetricsLogsPage,
        throughput: Option<Vec<ThroughputPoint>>,
    ) -> Self {
        let data_counts = DataCounts {
            total_logs: logs.total,
            logs_in_snapshot: logs.data.len(),
            latency_data_points: latency.series.len(),
            has_throughput: throughput.is_some(),
        };
        Self {
            metadata: SnapshotMetadata {
                generated_at: format_timestamp(generated_at),
                filters: SnapshotFilters::from(filter),
                data_counts,
            },
            summary,
            latency,
            logs,
            throughput,
        }
    }
}

/// `<prefix>-<timestamp>.<ext>` with the characters that upset file systems replaced.
pub fn default_file_name(prefix: &str, at: DateTime<Utc>, format: ExportFormat) -> String {
    let stamp = format_timestamp(at).replace([':', '.'], "-");
    format!("{prefix}-{stamp}.{}", format.as_str())
}

/// Uses `output` as is, unless it names a directory, in which case a default file name
/// is placed inside it.
pub fn resolve_output_path(
    output: &Path,
    prefix: &str,
    at: DateTime<Utc>,
    format: ExportFormat,
) -> PathBuf {
    if output.is_dir() {
        output.join(default_file_name(prefix, at, format))
    } else {
        output.to_path_buf()
    }
}

pub fn write_export(path: &Path, contents: &str) -> Result<(), ExportError> {
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::economic::EconomicImpactResult;
    use crate::domain::metrics::MetricStatus;
    use crate::test_support::{at_second, build_log};

    #[test]
    fn delimited_text_has_header_plus_one_line_per_row() {
        let logs = vec![
            build_log("1", MetricStatus::Delivered, Some(120.0)),
            build_log("2", MetricStatus::Failed, None),
            build_log("3", MetricStatus::Acked, Some(0.0)),
        ];
        let text = to_delimited_text(&logs).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID,Created At,Channel,Status,Latency (ms)"));
        assert!(lines[1].starts_with("1,2026-03-01T12:00:00.000Z,EMAIL,DELIVERED,120,"));
        assert!(lines[2].starts_with("2,2026-03-01T12:00:00.000Z,EMAIL,FAILED,,"));
        assert!(lines[3].contains(",ACKED,0,"));
    }

    #[test]
    fn fields_with_commas_and_quotes_are_escaped() {
        let mut log = build_log("1", MetricStatus::Failed, None);
        log.error_message = Some("timeout, \"provider\" unreachable".to_string());
        let text = to_delimited_text(&[log]).unwrap();

        assert!(text.contains(r#","timeout, ""provider"" unreachable","#));
        let mut reader = ReaderBuilder::new().from_reader(text.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), MetricsLog::header().len());
        assert_eq!(&record[8], "timeout, \"provider\" unreachable");
    }

    #[test]
    fn empty_rows_give_only_the_header() {
        let text = to_delimited_text::<MetricsLog>(&[]).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn server_csv_is_rewritten_with_escaping() {
        let raw = "name,note\n\"run, one\",ok\nrun two,\"said \"\"hi\"\"\"\n";
        let text = reformat_delimited(raw).unwrap();
        assert_eq!(text, raw);
    }

    #[test]
    fn structured_document_round_trips() {
        let payload = serde_json::json!({"a": 1, "b": 2});
        let text = to_structured_document(&payload).unwrap();
        assert!(text.contains("\n  \"a\": 1"));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn export_document_is_byte_stable() {
        let logs = vec![build_log("1", MetricStatus::Delivered, Some(12.5))];
        let filter = MetricsFilter {
            experiment_run_id: Some("exp-1".to_string()),
            ..MetricsFilter::default()
        };
        let first =
            to_structured_document(&ExportDocument::new(at_second(5), filter.clone(), 7, &logs))
                .unwrap();
        let second =
            to_structured_document(&ExportDocument::new(at_second(5), filter, 7, &logs)).unwrap();
        assert_eq!(first, second);

        let parsed: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed["metadata"]["exportedAt"], "2026-03-01T12:00:05.000Z");
        assert_eq!(parsed["metadata"]["totalRecords"], 7);
        assert_eq!(parsed["metadata"]["exportedRecords"], 1);
        assert_eq!(parsed["metadata"]["filters"]["experimentRunId"], "exp-1");
        assert_eq!(parsed["data"][0]["latencyMs"], 12.5);
    }

    #[test]
    fn scenario_rows_show_percent_and_cents() {
        let scenario = Scenario {
            name: "Very conservative".to_string(),
            result: EconomicImpactResult {
                reduction_percentage: 10.0,
                avoided_cancellations: 7536,
                estimated_annual_savings: 2555107.15,
            },
        };
        assert_eq!(
            scenario.fields(),
            vec!["Very conservative", "10%", "7536", "2555107.15"]
        );
    }

    #[test]
    fn header_only_server_csv_is_empty() {
        assert!(matches!(reformat_delimited(""), Err(ExportError::Empty)));
        assert!(matches!(
            reformat_delimited("tOffsetSec,note\n"),
            Err(ExportError::Empty)
        ));
    }

    #[test]
    fn experiment_export_without_data_is_empty() {
        for raw in ["", "  \n", "null", "[]", "{}"] {
            assert!(
                matches!(
                    ExperimentExport::from_raw(at_second(0), "exp-1", raw),
                    Err(ExportError::Empty)
                ),
                "{raw:?} should be rejected"
            );
        }
        let export = ExperimentExport::from_raw(at_second(0), "exp-1", r#"{"runs": 1}"#).unwrap();
        assert_eq!(export.data["runs"], 1);
    }

    #[test]
    fn economic_report_blocks() {
        let inputs = EconomicImpactInputs {
            annual_failed_hearings: 1000,
            average_cost_per_hearing: 100.0,
            reduction_percentage: 15.0,
        };
        let result = |reduction_percentage: f64, avoided: u64| EconomicImpactResult {
            reduction_percentage,
            avoided_cancellations: avoided,
            estimated_annual_savings: avoided as f64 * 100.0,
        };
        let report = EconomicImpactExport::new(
            at_second(0),
            inputs,
            result(15.0, 150),
            vec![Scenario {
                name: "Very conservative".to_string(),
                result: result(10.0, 100),
            }],
        );

        let text = report.to_delimited_text().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Scenario,Reduction (%),Avoided Cancellations,Annual Savings (USD)",
                "Very conservative,10%,100,10000.00",
                "",
                "Current estimate,15%,150,15000.00",
                "",
                "Inputs",
                "Annual failed hearings,1000",
                "Average cost per hearing (USD),100",
                "Reduction (%),15%",
                "",
                "Timestamp,2026-03-01T12:00:00.000Z",
            ]
        );

        let parsed: Value = serde_json::from_str(&to_structured_document(&report).unwrap()).unwrap();
        assert_eq!(parsed["timestamp"], "2026-03-01T12:00:00.000Z");
        assert_eq!(parsed["inputs"]["annualFailedHearings"], 1000);
        assert_eq!(parsed["currentResult"]["avoidedCancellations"], 150);
        assert_eq!(parsed["scenarios"][0]["name"], "Very conservative");
        assert_eq!(parsed["scenarios"][0]["reductionPercentage"], 10.0);
    }

    #[test]
    fn snapshot_filters_use_placeholders() {
        let filters = SnapshotFilters::from(&MetricsFilter {
            from: Some("2026-03-01".to_string()),
            ..MetricsFilter::default()
        });
        assert_eq!(filters.from, "2026-03-01");
        assert_eq!(filters.to, NOT_SPECIFIED);
        assert_eq!(filters.channel, "all");
        assert_eq!(filters.experiment_run_id, NOT_SPECIFIED);
    }

    #[test]
    fn default_file_name_is_file_system_safe() {
        assert_eq!(
            default_file_name("metrics-logs", at_second(0), ExportFormat::Csv),
            "metrics-logs-2026-03-01T12-00-00-000Z.csv"
        );
    }

    #[test]
    fn directory_output_gets_a_default_name() {
        let dir = assert_fs::TempDir::new().unwrap();
        let resolved =
            resolve_output_path(dir.path(), "metrics-logs", at_second(0), ExportFormat::Json);
        assert_eq!(
            resolved,
            dir.path().join("metrics-logs-2026-03-01T12-00-00-000Z.json")
        );

        let file = dir.path().join("logs.json");
        assert_eq!(
            resolve_output_path(&file, "metrics-logs", at_second(0), ExportFormat::Json),
            file
        );
    }
}

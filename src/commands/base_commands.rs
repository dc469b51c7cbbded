use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::domain::channel::ChannelTarget;
use crate::domain::experiment::ExperimentScenario;
use crate::domain::metrics::MetricStatus;
use crate::services::export::ExportFormat;
use crate::services::query_filters::MetricsFilter;

#[derive(Parser)]
#[command(
    name = "notify-metrics",
    author,
    version,
    about = "Monitor notification experiments and compare EMAIL and TELEGRAM delivery"
)]
pub struct CliArgs {
    /// Path to console config YAML
    #[arg(short, long, global = true)]
    pub config: Option<String>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// Filters shared by every metrics view.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Window start (RFC 3339, YYYY-MM-DDTHH:MM in local time, or YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,
    /// Window end, same formats as --from
    #[arg(long)]
    pub to: Option<String>,
    /// EMAIL, TELEGRAM or BOTH
    #[arg(long)]
    pub channel: Option<ChannelTarget>,
    /// Restrict to one experiment run
    #[arg(long = "experiment")]
    pub experiment_run_id: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> MetricsFilter {
        MetricsFilter {
            from: self.from.clone(),
            to: self.to.clone(),
            channel: self.channel,
            experiment_run_id: self.experiment_run_id.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show delivery totals and the per-channel breakdown
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show latency percentiles and the merged per-channel p95 series
    Latency {
        #[command(flatten)]
        filters: FilterArgs,
        /// Also write the merged series as CSV
        #[arg(long)]
        csv: Option<String>,
    },
    /// Compare EMAIL and TELEGRAM metric by metric
    Compare {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Plot the per-channel p95 series into a PNG chart
    PlotLatency {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output PNG file
        #[arg(short, long)]
        output: String,
    },
    /// List one page of delivery logs
    Logs {
        #[command(flatten)]
        filters: FilterArgs,
        /// PENDING, SENT, ACKED, DELIVERED or FAILED
        #[arg(long)]
        status: Option<MetricStatus>,
        /// Free-text search (correlation id, recipient hash, ...)
        #[arg(short = 'q', long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
        page_size: u32,
    },
    /// Export every matching delivery log
    ExportLogs {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(short, long, value_enum)]
        format: ExportFormat,
        /// Output file, or a directory to receive a timestamped file
        #[arg(short, long)]
        output: String,
    },
    /// Write a self-describing JSON snapshot of summary, latency, logs and throughput
    Snapshot {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file, or a directory to receive a timestamped file
        #[arg(short, long)]
        output: String,
    },
    /// Manage and watch experiment runs
    Experiments {
        #[command(subcommand)]
        command: ExperimentCommands,
    },
    /// Estimate savings from fewer failed hearings
    EconomicImpact {
        /// Failed hearings per year
        #[arg(long)]
        failed: Option<u64>,
        /// Average cost per failed hearing
        #[arg(long)]
        cost: Option<f64>,
        /// Expected reduction in percent (0-100)
        #[arg(long)]
        reduction: Option<f64>,
        /// Start from the backend's published defaults and scenarios
        #[arg(long)]
        server_defaults: bool,
        /// Also write the scenario table, inputs and timestamp as CSV (file or directory)
        #[arg(long)]
        csv: Option<String>,
        /// Also write the inputs, current estimate and scenarios as JSON (file or directory)
        #[arg(long)]
        json: Option<String>,
    },
    /// Refresh a hearing's details until interrupted or deleted
    WatchHearing {
        /// Hearing id
        id: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ExperimentCommands {
    /// List experiment runs
    List,
    /// Show one run with its summary and series points
    Show { id: String },
    /// Create a new run in CREATED state
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// LATENCY, THROUGHPUT or ERROR_INJECTION
        #[arg(long, default_value = "LATENCY")]
        scenario: ExperimentScenario,
        /// EMAIL, TELEGRAM or BOTH
        #[arg(long, default_value = "EMAIL")]
        channel: ChannelTarget,
        #[arg(long, default_value_t = 100)]
        total_messages: u64,
        #[arg(long, default_value_t = 5)]
        concurrency: u32,
        #[arg(long)]
        rate_per_sec: Option<f64>,
        /// Simulate sends without calling delivery providers
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Trigger a run
    Run {
        id: String,
        /// Simulate sends without calling delivery providers
        #[arg(long)]
        dry_run: bool,
        /// Keep polling until the run finishes
        #[arg(long)]
        watch: bool,
    },
    /// Poll a run until it finishes
    Watch { id: String },
    /// Delete a run
    Delete { id: String },
    /// Show the throughput series of a run
    Throughput { id: String },
    /// Export a run as served by the backend
    Export {
        id: String,
        #[arg(short, long, value_enum)]
        format: ExportFormat,
        /// Output file, or a directory to receive a timestamped file
        #[arg(short, long)]
        output: String,
    },
}

use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use notify_metrics::commands::base_commands::{CliArgs, Commands, ExperimentCommands};
use notify_metrics::commands::console::{CommandError, Console};
use notify_metrics::commands::economic_cmd::{InputOverrides, economic_impact_command};
use notify_metrics::commands::experiments_cmd;
use notify_metrics::commands::export_cmd::{export_logs_command, snapshot_command};
use notify_metrics::commands::hearing_cmd::watch_hearing_command;
use notify_metrics::commands::metrics_cmd::{
    compare_command, latency_command, logs_command, plot_latency_command, summary_command,
};
use notify_metrics::domain::experiment::CreateExperiment;
use notify_metrics::services::console_config::ConsoleConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        "notify_metrics=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    if let Commands::Completions { shell } = args.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = match ConsoleConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(base_url = %config.base_url, "configuration loaded");

    let result = match Console::new(config) {
        Ok(console) => run(&console, args.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(console: &Console, command: Commands) -> Result<(), CommandError> {
    match command {
        Commands::Summary { filters } => summary_command(console, &filters).await,
        Commands::Latency { filters, csv } => {
            latency_command(console, &filters, csv.as_deref()).await
        }
        Commands::Compare { filters } => compare_command(console, &filters).await,
        Commands::PlotLatency { filters, output } => {
            plot_latency_command(console, &filters, &output).await
        }
        Commands::Logs {
            filters,
            status,
            search,
            page,
            page_size,
        } => logs_command(console, &filters, status, search, page, page_size).await,
        Commands::ExportLogs {
            filters,
            format,
            output,
        } => export_logs_command(console, &filters, format, &output).await,
        Commands::Snapshot { filters, output } => {
            snapshot_command(console, &filters, &output).await
        }
        Commands::Experiments { command } => run_experiments(console, command).await,
        Commands::EconomicImpact {
            failed,
            cost,
            reduction,
            server_defaults,
            csv,
            json,
        } => {
            let overrides = InputOverrides {
                failed,
                cost,
                reduction,
            };
            economic_impact_command(
                console,
                overrides,
                server_defaults,
                csv.as_deref(),
                json.as_deref(),
            )
            .await
        }
        Commands::WatchHearing { id } => watch_hearing_command(console, &id).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

async fn run_experiments(console: &Console, command: ExperimentCommands) -> Result<(), CommandError> {
    match command {
        ExperimentCommands::List => experiments_cmd::list_command(console).await,
        ExperimentCommands::Show { id } => experiments_cmd::show_command(console, &id).await,
        ExperimentCommands::Create {
            name,
            description,
            scenario,
            channel,
            total_messages,
            concurrency,
            rate_per_sec,
            dry_run,
            created_by,
        } => {
            let request = CreateExperiment {
                name,
                description,
                scenario,
                channel_target: channel,
                total_messages,
                concurrency,
                rate_per_sec,
                dry_run: dry_run.then_some(true),
                created_by,
            };
            experiments_cmd::create_command(console, &request).await
        }
        ExperimentCommands::Run { id, dry_run, watch } => {
            experiments_cmd::run_command(console, &id, dry_run, watch).await
        }
        ExperimentCommands::Watch { id } => experiments_cmd::watch_experiment(console, &id).await,
        ExperimentCommands::Delete { id } => experiments_cmd::delete_command(console, &id).await,
        ExperimentCommands::Throughput { id } => {
            experiments_cmd::throughput_command(console, &id).await
        }
        ExperimentCommands::Export { id, format, output } => {
            experiments_cmd::export_command(console, &id, format, &output).await
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = CliArgs::command();
    generate(shell, &mut cmd, "notify-metrics", &mut io::stdout());
}

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::commands::console::{CommandError, Console};
use crate::commands::report_format::{format_experiment, format_experiment_list, format_throughput};
use crate::domain::experiment::{CreateExperiment, ExperimentRun};
use crate::services::api_client::ExperimentSource;
use crate::services::data_source::Snapshot;
use crate::services::export::{
    ExperimentExport, ExportError, ExportFormat, reformat_delimited, resolve_output_path,
    to_structured_document, write_export,
};
use crate::services::poller::PollOutcome;
use crate::services::snapshot_cache::CacheKey;

pub async fn list_command(console: &Console) -> Result<(), CommandError> {
    let runs = console.client.list_experiments().await?;
    println!("{}", format_experiment_list(&runs));
    Ok(())
}

pub async fn show_command(console: &Console, id: &str) -> Result<(), CommandError> {
    let run = console
        .client
        .get_experiment(id)
        .await
        .map_err(CommandError::naming(format!("experiment {id}")))?;
    console
        .cache
        .record(CacheKey::Experiment(run.id.clone()), run.clone().into_cached());
    println!("{}", format_experiment(&run));
    Ok(())
}

pub async fn create_command(
    console: &Console,
    request: &CreateExperiment,
) -> Result<(), CommandError> {
    let run = console.client.create_experiment(request).await?;
    info!(id = %run.id, name = %run.name, "experiment created");
    println!("Created experiment {} ({})", run.name, run.id);
    console
        .cache
        .record(CacheKey::Experiment(run.id.clone()), run.into_cached());
    Ok(())
}

pub async fn run_command(
    console: &Console,
    id: &str,
    dry_run: bool,
    watch: bool,
) -> Result<(), CommandError> {
    let key = CacheKey::Experiment(id.to_string());
    console.cache.evict(&key);
    let ack = console
        .client
        .run_experiment(id, dry_run)
        .await
        .map_err(CommandError::naming(format!("experiment {id}")))?;
    console.cache.evict(&key);
    println!("{}", ack.message);

    if watch {
        watch_experiment(console, id).await?;
    }
    Ok(())
}

pub async fn delete_command(console: &Console, id: &str) -> Result<(), CommandError> {
    let key = CacheKey::Experiment(id.to_string());
    console.cache.evict(&key);
    let ack = console
        .client
        .delete_experiment(id)
        .await
        .map_err(CommandError::naming(format!("experiment {id}")))?;
    console.cache.evict(&key);
    println!("{}", ack.message);
    Ok(())
}

pub async fn throughput_command(console: &Console, id: &str) -> Result<(), CommandError> {
    let points = console.client.get_throughput(id).await?;
    println!("{}", format_throughput(&points));
    Ok(())
}

pub async fn export_command(
    console: &Console,
    id: &str,
    format: ExportFormat,
    output: &str,
) -> Result<(), CommandError> {
    let raw = console
        .client
        .export_experiment(id, format)
        .await
        .map_err(CommandError::naming(format!("experiment {id}")))?;
    if raw.trim().is_empty() {
        return Err(ExportError::Empty.into());
    }

    let now = Utc::now();
    let contents = match format {
        ExportFormat::Csv => reformat_delimited(&raw)?,
        ExportFormat::Json => to_structured_document(&ExperimentExport::from_raw(now, id, &raw)?)?,
    };
    let prefix = format!("experiment-{id}");
    let path = resolve_output_path(Path::new(output), &prefix, now, format);
    write_export(&path, &contents)?;
    println!("Experiment {id} exported to {}", path.display());
    Ok(())
}

fn format_progress(run: &ExperimentRun) -> String {
    match run.series_points.last() {
        Some(point) => format!(
            "[{}] {}: {}/{} sent, {} ok, {} failed",
            run.status, run.id, point.sent_count, run.total_messages, point.success_count, point.fail_count
        ),
        None => format!("[{}] {}: waiting for first results", run.status, run.id),
    }
}

/// Polls a run until it reaches a terminal state, is deleted, or the user hits Ctrl-C.
pub async fn watch_experiment(console: &Console, id: &str) -> Result<(), CommandError> {
    let poller = console.experiment_poller();
    info!(id, interval_ms = poller.interval().as_millis() as u64, "watching experiment");
    let mut handle = poller.start(ExperimentSource::new(Arc::clone(&console.client), id));
    let mut updates = handle.latest();

    let outcome = loop {
        tokio::select! {
            biased;
            outcome = handle.finished() => break outcome?,
            changed = updates.changed() => {
                if changed.is_err() {
                    break handle.finished().await?;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(run) = latest {
                    println!("{}", format_progress(&run));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break handle.finished().await?;
            }
        }
    };

    match outcome {
        PollOutcome::Finished(run) => {
            println!("Experiment {} finished with status {}", run.id, run.status);
            println!("{}", format_experiment(&run));
        }
        PollOutcome::NotStarted(run) => {
            println!(
                "Experiment {} has not started (status {}); trigger it with `experiments run {}`",
                run.id, run.status, run.id
            );
        }
        PollOutcome::Gone => {
            println!("Experiment {id} no longer exists");
        }
        PollOutcome::Cancelled => {
            println!("Stopped watching experiment {id}");
        }
    }
    Ok(())
}

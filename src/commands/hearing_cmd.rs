use std::sync::Arc;

use tracing::info;

use crate::commands::console::{CommandError, Console};
use crate::commands::report_format::format_hearing;
use crate::domain::hearing::Hearing;
use crate::services::api_client::HearingSource;
use crate::services::poller::PollOutcome;

/// Keeps a hearing's detail view fresh until Ctrl-C or until the backend reports it gone.
/// Only snapshots that differ from the previous one are printed.
pub async fn watch_hearing_command(console: &Console, id: &str) -> Result<(), CommandError> {
    let poller = console.detail_poller();
    info!(id, interval_ms = poller.interval().as_millis() as u64, "watching hearing");
    let mut handle = poller.start(HearingSource::new(Arc::clone(&console.client), id));
    let mut updates = handle.latest();
    let mut shown: Option<Hearing> = None;

    let outcome = loop {
        tokio::select! {
            biased;
            outcome = handle.finished() => break outcome?,
            changed = updates.changed() => {
                if changed.is_err() {
                    break handle.finished().await?;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(hearing) = latest.filter(|hearing| shown.as_ref() != Some(hearing)) {
                    if shown.is_some() {
                        println!();
                    }
                    println!("{}", format_hearing(&hearing));
                    shown = Some(hearing);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break handle.finished().await?;
            }
        }
    };

    match outcome {
        PollOutcome::Gone => println!("Hearing {id} was deleted or is no longer available"),
        PollOutcome::Cancelled => println!("Stopped watching hearing {id}"),
        PollOutcome::Finished(hearing) | PollOutcome::NotStarted(hearing) => {
            println!("{}", format_hearing(&hearing));
        }
    }
    Ok(())
}

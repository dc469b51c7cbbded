use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::domain::channel::{Channel, ChannelTarget};
use crate::domain::experiment::{ExperimentRun, ExperimentScenario, ExperimentStatus};
use crate::domain::hearing::{Hearing, HearingStatus};
use crate::domain::metrics::{MetricStatus, MetricsLog};
use crate::services::data_source::{ApiError, Snapshot, SnapshotSource};
use crate::services::snapshot_cache::CacheKey;

pub fn at_second(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(second as i64)
}

pub fn build_log(id: &str, status: MetricStatus, latency_ms: Option<f64>) -> MetricsLog {
    MetricsLog {
        id: id.to_string(),
        channel: Channel::Email,
        template: Some("hearing-reminder".to_string()),
        recipient_hash: format!("hash-{id}"),
        correlation_id: format!("corr-{id}"),
        status,
        sent_at: at_second(0),
        provider_ack_at: None,
        delivered_at: None,
        latency_ms,
        error_code: None,
        error_message: None,
        retry_count: 0,
        experiment_run_id: None,
        created_at: at_second(0),
        updated_at: at_second(1),
    }
}

pub fn build_experiment(id: &str, status: ExperimentStatus) -> ExperimentRun {
    ExperimentRun {
        id: id.to_string(),
        name: format!("run {id}"),
        description: None,
        scenario: ExperimentScenario::Latency,
        channel_target: ChannelTarget::Both,
        total_messages: 100,
        concurrency: 5,
        rate_per_sec: None,
        started_at: None,
        finished_at: None,
        status,
        summary_json: None,
        created_by: None,
        created_at: at_second(0),
        series_points: Vec::new(),
    }
}

pub fn build_hearing(id: &str) -> Hearing {
    Hearing {
        id: id.to_string(),
        case_number: "2026-0042".to_string(),
        hearing_type: "Civil".to_string(),
        date: "2026-04-10".to_string(),
        time: "09:30".to_string(),
        room: "Sala 3".to_string(),
        description: None,
        status: HearingStatus::Scheduled,
    }
}

/// A snapshot source replaying a fixed list of responses, then failing with a
/// connection error once the script runs out.
pub struct ScriptedSource<S> {
    key: CacheKey,
    responses: Mutex<VecDeque<Result<S, ApiError>>>,
    fetches: Arc<AtomicUsize>,
}

impl<S> ScriptedSource<S> {
    pub fn new(key: CacheKey, responses: Vec<Result<S, ApiError>>) -> Self {
        Self {
            key,
            responses: Mutex::new(responses.into()),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait::async_trait]
impl<S: Snapshot> SnapshotSource for ScriptedSource<S> {
    type Item = S;

    fn key(&self) -> CacheKey {
        self.key.clone()
    }

    async fn fetch(&self) -> Result<S, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Connection("script exhausted".to_string())))
    }
}

//! Cancellable polling of server-owned snapshots.
//!
//! A poller starts `Idle`, moves to `Polling` once the entity is observed active and ends
//! `Stopped` on a terminal snapshot, a not-found response or cancellation. Transient fetch
//! failures are logged and retried on the next tick; they never stop the poller.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::data_source::{ApiError, Lifecycle, Snapshot, SnapshotSource};
use crate::services::snapshot_cache::{CacheKey, RecordOutcome, SnapshotCache};

pub const EXPERIMENT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DETAIL_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<S> {
    /// A terminal snapshot was observed.
    Finished(S),
    /// The first observation showed an entity that has not started.
    NotStarted(S),
    /// The entity no longer exists; its cache entry was evicted.
    Gone,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("poller task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("poller outcome was already taken")]
    AlreadyFinished,
}

pub struct PollHandle<S> {
    token: CancellationToken,
    // Held while cancelling and while applying a fetched snapshot.
    apply_gate: Arc<Mutex<()>>,
    state: Arc<watch::Sender<PollState>>,
    latest: watch::Receiver<Option<S>>,
    task: Option<JoinHandle<PollOutcome<S>>>,
}

impl<S: Snapshot> PollHandle<S> {
    /// Stops the poller at once. A fetch already in flight may still complete, but its
    /// result is discarded. Nothing is written to the cache after this returns.
    pub fn cancel(&self) {
        let _gate = self.apply_gate.lock();
        self.token.cancel();
        self.state.send_replace(PollState::Stopped);
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Receiver of the newest accepted snapshot.
    pub fn latest(&self) -> watch::Receiver<Option<S>> {
        self.latest.clone()
    }

    /// Waits for the poller to stop. Dropping this future early leaves the poller running
    /// and the outcome available to a later call.
    pub async fn finished(&mut self) -> Result<PollOutcome<S>, PollError> {
        let task = self.task.as_mut().ok_or(PollError::AlreadyFinished)?;
        let outcome = task.await?;
        self.task = None;
        Ok(outcome)
    }
}

#[derive(Debug, Clone)]
pub struct Poller {
    cache: SnapshotCache,
    interval: Duration,
}

impl Poller {
    pub fn new(cache: SnapshotCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the polling task. The first fetch happens immediately; each later fetch
    /// follows the previous one by the configured interval.
    pub fn start<Src: SnapshotSource>(&self, source: Src) -> PollHandle<Src::Item> {
        let token = CancellationToken::new();
        let apply_gate = Arc::new(Mutex::new(()));
        let (state, _) = watch::channel(PollState::Idle);
        let state = Arc::new(state);
        let (latest_tx, latest_rx) = watch::channel(None);

        let task = tokio::spawn(poll_loop(
            source,
            self.cache.clone(),
            self.interval,
            token.clone(),
            Arc::clone(&apply_gate),
            Arc::clone(&state),
            latest_tx,
        ));

        PollHandle {
            token,
            apply_gate,
            state,
            latest: latest_rx,
            task: Some(task),
        }
    }
}

async fn poll_loop<Src: SnapshotSource>(
    source: Src,
    cache: SnapshotCache,
    interval: Duration,
    token: CancellationToken,
    apply_gate: Arc<Mutex<()>>,
    state: Arc<watch::Sender<PollState>>,
    latest: watch::Sender<Option<Src::Item>>,
) -> PollOutcome<Src::Item> {
    let key = source.key();

    loop {
        if token.is_cancelled() {
            return stop(&state, PollOutcome::Cancelled);
        }

        let fetched = source.fetch().await;
        let applied = {
            let _gate = apply_gate.lock();
            if token.is_cancelled() {
                debug!(?key, "discarding fetch that completed after cancellation");
                Some(PollOutcome::Cancelled)
            } else {
                apply_fetch(fetched, &key, &cache, interval, &state, &latest)
            }
        };
        if let Some(outcome) = applied {
            return stop(&state, outcome);
        }

        tokio::select! {
            _ = token.cancelled() => return stop(&state, PollOutcome::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Records one fetch result. Returns the outcome when polling should stop.
fn apply_fetch<S: Snapshot>(
    fetched: Result<S, ApiError>,
    key: &CacheKey,
    cache: &SnapshotCache,
    interval: Duration,
    state: &watch::Sender<PollState>,
    latest: &watch::Sender<Option<S>>,
) -> Option<PollOutcome<S>> {
    match fetched {
        Ok(snapshot) => {
            let current = match cache.record(key.clone(), snapshot.clone().into_cached()) {
                RecordOutcome::Stored => snapshot,
                RecordOutcome::IgnoredStale => cache.get_as(key).unwrap_or(snapshot),
            };
            latest.send_replace(Some(current.clone()));

            let idle = *state.borrow() == PollState::Idle;
            match current.lifecycle() {
                Lifecycle::Terminal => {
                    info!(?key, "terminal snapshot observed, polling stopped");
                    Some(PollOutcome::Finished(current))
                }
                Lifecycle::Pending if idle => {
                    debug!(?key, "entity has not started, nothing to poll");
                    Some(PollOutcome::NotStarted(current))
                }
                Lifecycle::Active if idle => {
                    debug!(?key, interval_ms = interval.as_millis() as u64, "polling started");
                    state.send_replace(PollState::Polling);
                    None
                }
                _ => None,
            }
        }
        Err(ApiError::NotFound) => {
            cache.evict(key);
            info!(?key, "entity no longer exists, polling stopped");
            Some(PollOutcome::Gone)
        }
        Err(error) => {
            warn!(?key, %error, transient = error.is_transient(), "fetch failed, retrying on next tick");
            None
        }
    }
}

fn stop<S>(state: &watch::Sender<PollState>, outcome: PollOutcome<S>) -> PollOutcome<S> {
    state.send_replace(PollState::Stopped);
    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::domain::experiment::{ExperimentRun, ExperimentStatus};
    use crate::domain::hearing::Hearing;
    use crate::test_support::{ScriptedSource, build_experiment, build_hearing};

    fn experiment_key() -> CacheKey {
        CacheKey::Experiment("exp-1".to_string())
    }

    fn running() -> Result<ExperimentRun, ApiError> {
        Ok(build_experiment("exp-1", ExperimentStatus::Running))
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_terminal_status() {
        let source = ScriptedSource::new(
            experiment_key(),
            vec![
                running(),
                running(),
                Ok(build_experiment("exp-1", ExperimentStatus::Done)),
            ],
        );
        let fetches = source.fetch_counter();
        let cache = SnapshotCache::new();

        let mut handle = Poller::new(cache.clone(), EXPERIMENT_POLL_INTERVAL).start(source);
        let outcome = handle.finished().await.unwrap();

        match outcome {
            PollOutcome::Finished(run) => assert_eq!(run.status, ExperimentStatus::Done),
            other => panic!("unexpected outcome {other:?}"),
        }
        tokio::time::sleep(EXPERIMENT_POLL_INTERVAL * 5).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        let cached: ExperimentRun = cache.get_as(&experiment_key()).unwrap();
        assert_eq!(cached.status, ExperimentStatus::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let source = ScriptedSource::new(
            experiment_key(),
            vec![
                Err(ApiError::Connection("refused".to_string())),
                running(),
                Err(ApiError::Server(502)),
                Ok(build_experiment("exp-1", ExperimentStatus::Failed)),
            ],
        );
        let fetches = source.fetch_counter();

        let mut handle = Poller::new(SnapshotCache::new(), EXPERIMENT_POLL_INTERVAL).start(source);
        let outcome = handle.finished().await.unwrap();

        assert!(matches!(outcome, PollOutcome::Finished(ref run) if run.status == ExperimentStatus::Failed));
        assert_eq!(fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn created_experiment_is_not_polled() {
        let source = ScriptedSource::new(
            experiment_key(),
            vec![Ok(build_experiment("exp-1", ExperimentStatus::Created))],
        );
        let fetches = source.fetch_counter();

        let mut handle = Poller::new(SnapshotCache::new(), EXPERIMENT_POLL_INTERVAL).start(source);
        let mut states = handle.state_changes();
        let outcome = handle.finished().await.unwrap();

        assert!(matches!(outcome, PollOutcome::NotStarted(_)));
        assert_eq!(*states.borrow_and_update(), PollState::Stopped);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_running_snapshot_does_not_regress_done() {
        let cache = SnapshotCache::new();
        cache.record(
            experiment_key(),
            crate::services::data_source::Snapshot::into_cached(build_experiment(
                "exp-1",
                ExperimentStatus::Done,
            )),
        );
        let source = ScriptedSource::new(experiment_key(), vec![running(), running()]);
        let fetches = source.fetch_counter();

        let mut handle = Poller::new(cache.clone(), EXPERIMENT_POLL_INTERVAL).start(source);
        let outcome = handle.finished().await.unwrap();

        match outcome {
            PollOutcome::Finished(run) => assert_eq!(run.status, ExperimentStatus::Done),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_evicts_and_stops() {
        let cache = SnapshotCache::new();
        let key = CacheKey::Hearing("h-1".to_string());
        let source = ScriptedSource::new(
            key.clone(),
            vec![
                Ok(build_hearing("h-1")),
                Ok(build_hearing("h-1")),
                Err(ApiError::NotFound),
            ],
        );
        let fetches = source.fetch_counter();

        let mut handle = Poller::new(cache.clone(), DETAIL_REFRESH_INTERVAL).start(source);
        let outcome: PollOutcome<Hearing> = handle.finished().await.unwrap();

        assert_eq!(outcome, PollOutcome::Gone);
        assert!(cache.get(&key).is_none());
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_between_ticks_stops_immediately() {
        let source = ScriptedSource::new(experiment_key(), vec![running(), running(), running()]);
        let fetches = source.fetch_counter();

        let mut handle = Poller::new(SnapshotCache::new(), EXPERIMENT_POLL_INTERVAL).start(source);
        let mut latest = handle.latest();
        latest.changed().await.unwrap();
        assert_eq!(handle.state(), PollState::Polling);

        handle.cancel();
        assert_eq!(handle.state(), PollState::Stopped);
        let outcome = handle.finished().await.unwrap();

        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    struct GatedSource {
        started: Arc<Notify>,
        release: Arc<Notify>,
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl SnapshotSource for GatedSource {
        type Item = ExperimentRun;

        fn key(&self) -> CacheKey {
            experiment_key()
        }

        async fn fetch(&self) -> Result<ExperimentRun, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(build_experiment("exp-1", ExperimentStatus::Done))
        }
    }

    #[tokio::test]
    async fn result_of_in_flight_fetch_is_discarded_after_cancel() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = SnapshotCache::new();

        let mut handle = Poller::new(cache.clone(), EXPERIMENT_POLL_INTERVAL).start(GatedSource {
            started: Arc::clone(&started),
            release: Arc::clone(&release),
            fetches: Arc::clone(&fetches),
        });

        started.notified().await;
        handle.cancel();
        release.notify_one();
        let latest = handle.latest();
        let outcome = handle.finished().await.unwrap();

        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert!(cache.is_empty());
        assert!(latest.borrow().is_none());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn nothing_is_cached_once_cancel_returns() {
        for _ in 0..50 {
            let started = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            let cache = SnapshotCache::new();

            let mut handle = Poller::new(cache.clone(), EXPERIMENT_POLL_INTERVAL).start(GatedSource {
                started: Arc::clone(&started),
                release: Arc::clone(&release),
                fetches: Arc::new(AtomicUsize::new(0)),
            });
            started.notified().await;

            let releaser = tokio::spawn(async move { release.notify_one() });
            handle.cancel();
            let cached_at_cancel = cache.len();
            let latest_at_cancel = handle.latest().borrow().is_some();
            releaser.await.unwrap();
            let outcome = handle.finished().await.unwrap();

            assert_eq!(cache.len(), cached_at_cancel);
            assert_eq!(handle.latest().borrow().is_some(), latest_at_cancel);
            match outcome {
                PollOutcome::Cancelled => assert!(cache.is_empty()),
                PollOutcome::Finished(run) => {
                    assert_eq!(run.status, ExperimentStatus::Done);
                    assert_eq!(cached_at_cancel, 1);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }
}

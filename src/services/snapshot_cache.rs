use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::experiment::ExperimentRun;
use crate::domain::hearing::Hearing;
use crate::services::data_source::{Lifecycle, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Experiment(String),
    Hearing(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedSnapshot {
    Experiment(ExperimentRun),
    Hearing(Hearing),
}

impl CachedSnapshot {
    fn is_terminal(&self) -> bool {
        match self {
            CachedSnapshot::Experiment(run) => run.status.is_terminal(),
            CachedSnapshot::Hearing(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored,
    /// A terminal entry was already cached and the incoming copy is not terminal.
    IgnoredStale,
}

/// Client-side cache of server snapshots, keyed by resource identity.
///
/// Writers either record a whole snapshot or evict the key; entries are never patched.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    entries: Arc<Mutex<HashMap<CacheKey, CachedSnapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedSnapshot> {
        self.entries.lock().get(key).cloned()
    }

    pub fn get_as<S: Snapshot>(&self, key: &CacheKey) -> Option<S> {
        self.get(key).and_then(S::from_cached)
    }

    /// Stores `snapshot` unless doing so would regress a terminal entry.
    pub fn record(&self, key: CacheKey, snapshot: CachedSnapshot) -> RecordOutcome {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            if existing.is_terminal() && !snapshot.is_terminal() {
                debug!(?key, "ignoring non-terminal snapshot over a terminal one");
                return RecordOutcome::IgnoredStale;
            }
        }
        entries.insert(key, snapshot);
        RecordOutcome::Stored
    }

    /// Removes the entry. Returns whether anything was cached.
    pub fn evict(&self, key: &CacheKey) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            debug!(?key, "evicted cached snapshot");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Snapshot for ExperimentRun {
    fn lifecycle(&self) -> Lifecycle {
        use crate::domain::experiment::ExperimentStatus;
        match self.status {
            ExperimentStatus::Created => Lifecycle::Pending,
            ExperimentStatus::Running => Lifecycle::Active,
            ExperimentStatus::Done | ExperimentStatus::Failed => Lifecycle::Terminal,
        }
    }

    fn into_cached(self) -> CachedSnapshot {
        CachedSnapshot::Experiment(self)
    }

    fn from_cached(cached: CachedSnapshot) -> Option<Self> {
        match cached {
            CachedSnapshot::Experiment(run) => Some(run),
            CachedSnapshot::Hearing(_) => None,
        }
    }
}

impl Snapshot for Hearing {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Active
    }

    fn into_cached(self) -> CachedSnapshot {
        CachedSnapshot::Hearing(self)
    }

    fn from_cached(cached: CachedSnapshot) -> Option<Self> {
        match cached {
            CachedSnapshot::Hearing(hearing) => Some(hearing),
            CachedSnapshot::Experiment(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::ExperimentStatus;
    use crate::test_support::{build_experiment, build_hearing};

    #[test]
    fn terminal_entries_never_regress() {
        let cache = SnapshotCache::new();
        let key = CacheKey::Experiment("exp-1".to_string());

        let done = build_experiment("exp-1", ExperimentStatus::Done);
        let running = build_experiment("exp-1", ExperimentStatus::Running);

        assert_eq!(cache.record(key.clone(), done.into_cached()), RecordOutcome::Stored);
        assert_eq!(
            cache.record(key.clone(), running.into_cached()),
            RecordOutcome::IgnoredStale
        );
        let current: ExperimentRun = cache.get_as(&key).unwrap();
        assert_eq!(current.status, ExperimentStatus::Done);
    }

    #[test]
    fn last_terminal_state_wins() {
        let cache = SnapshotCache::new();
        let key = CacheKey::Experiment("exp-1".to_string());
        cache.record(key.clone(), build_experiment("exp-1", ExperimentStatus::Done).into_cached());
        let outcome = cache.record(
            key.clone(),
            build_experiment("exp-1", ExperimentStatus::Failed).into_cached(),
        );
        assert_eq!(outcome, RecordOutcome::Stored);
        let current: ExperimentRun = cache.get_as(&key).unwrap();
        assert_eq!(current.status, ExperimentStatus::Failed);
    }

    #[test]
    fn evict_removes_only_the_named_entry() {
        let cache = SnapshotCache::new();
        let experiment = CacheKey::Experiment("exp-1".to_string());
        let hearing = CacheKey::Hearing("h-1".to_string());
        cache.record(
            experiment.clone(),
            build_experiment("exp-1", ExperimentStatus::Running).into_cached(),
        );
        cache.record(hearing.clone(), build_hearing("h-1").into_cached());

        assert!(cache.evict(&hearing));
        assert!(!cache.evict(&hearing));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&experiment).is_some());
    }

    #[test]
    fn typed_lookup_rejects_other_kinds() {
        let cache = SnapshotCache::new();
        let key = CacheKey::Hearing("h-1".to_string());
        cache.record(key.clone(), build_hearing("h-1").into_cached());
        assert!(cache.get_as::<ExperimentRun>(&key).is_none());
        assert!(cache.get_as::<Hearing>(&key).is_some());
    }

    #[test]
    fn clones_share_entries() {
        let cache = SnapshotCache::new();
        let other = cache.clone();
        cache.record(
            CacheKey::Hearing("h-1".to_string()),
            build_hearing("h-1").into_cached(),
        );
        assert_eq!(other.len(), 1);
        assert!(!other.is_empty());
    }
}

use thiserror::Error;

use crate::services::query_filters::FilterError;
use crate::services::snapshot_cache::{CacheKey, CachedSnapshot};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("server error (HTTP {0})")]
    Server(u16),
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Schema(String),
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Failures that may clear up on their own and are worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Connection(_) | ApiError::Server(_))
    }
}

/// Where a polled snapshot stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Exists but has not started; nothing to watch yet.
    Pending,
    /// Changing on the server; keep polling.
    Active,
    /// Final; polling stops.
    Terminal,
}

/// A server-owned entity the client caches a read-through copy of.
pub trait Snapshot: Clone + Send + Sync + 'static {
    fn lifecycle(&self) -> Lifecycle;
    fn into_cached(self) -> CachedSnapshot;
    fn from_cached(cached: CachedSnapshot) -> Option<Self>;
}

/// Describes an interface for fetching the current snapshot of one entity.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    type Item: Snapshot;

    fn key(&self) -> CacheKey;

    async fn fetch(&self) -> Result<Self::Item, ApiError>;
}

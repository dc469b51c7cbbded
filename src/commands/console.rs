use std::sync::Arc;

use thiserror::Error;

use crate::services::api_client::MetricsApiClient;
use crate::services::console_config::{ConfigError, ConsoleConfig};
use crate::services::data_source::ApiError;
use crate::services::economic_impact::EconomicImpactError;
use crate::services::export::ExportError;
use crate::services::latency_plot::LatencyPlotError;
use crate::services::poller::{PollError, Poller};
use crate::services::snapshot_cache::SnapshotCache;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Plot(#[from] LatencyPlotError),
    #[error(transparent)]
    EconomicImpact(#[from] EconomicImpactError),
    #[error(transparent)]
    Poll(#[from] PollError),
}

impl CommandError {
    /// Turns a bare not-found into a message naming the missing resource.
    pub fn naming(what: impl Into<String>) -> impl FnOnce(ApiError) -> CommandError {
        let what = what.into();
        move |err| match err {
            ApiError::NotFound => CommandError::NotFound(what),
            other => CommandError::Api(other),
        }
    }
}

/// Everything a command needs: config, API client and the shared snapshot cache.
pub struct Console {
    pub config: ConsoleConfig,
    pub client: Arc<MetricsApiClient>,
    pub cache: SnapshotCache,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Result<Self, CommandError> {
        let client = MetricsApiClient::new(&config)?;
        Ok(Self {
            config,
            client: Arc::new(client),
            cache: SnapshotCache::new(),
        })
    }

    pub fn experiment_poller(&self) -> Poller {
        Poller::new(self.cache.clone(), self.config.experiment_poll_interval())
    }

    pub fn detail_poller(&self) -> Poller {
        Poller::new(self.cache.clone(), self.config.detail_refresh_interval())
    }
}

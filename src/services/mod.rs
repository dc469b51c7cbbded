pub mod api_client;
pub mod comparator;
pub mod console_config;
pub mod data_source;
pub mod economic_impact;
pub mod export;
pub mod latency_plot;
pub mod percentiles;
pub mod poller;
pub mod query_filters;
pub mod schema;
pub mod series_merge;
pub mod snapshot_cache;

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::economic::EconomicImpactDefaults;
use crate::domain::experiment::{ActionAck, CreateExperiment, ExperimentRun};
use crate::domain::hearing::Hearing;
use crate::domain::metrics::{MetricsLatency, MetricsLogsPage, MetricsSummary, ThroughputPoint};
use crate::services::console_config::ConsoleConfig;
use crate::services::data_source::{ApiError, SnapshotSource};
use crate::services::export::ExportFormat;
use crate::services::query_filters::{LogsQuery, MetricsFilter};
use crate::services::schema::Validate;
use crate::services::snapshot_cache::CacheKey;

/// REST client for the notification-metrics backend.
pub struct MetricsApiClient {
    root: String,
    client: Client,
}

impl MetricsApiClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ApiError::Other(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            root: config.api_root().to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.root)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder
            .build()
            .map_err(|err| ApiError::Other(format!("invalid request: {err}")))?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if status.is_server_error() {
            return Err(ApiError::Server(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body, status),
            });
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned + Validate>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;
        let decoded: T =
            serde_json::from_slice(&body).map_err(|err| ApiError::Schema(err.to_string()))?;
        decoded.validate()?;
        Ok(decoded)
    }

    pub async fn get_summary(&self, filter: &MetricsFilter) -> Result<MetricsSummary, ApiError> {
        let query = filter.to_query_pairs()?;
        self.fetch_json(self.client.get(self.url("/metrics/summary")).query(&query))
            .await
    }

    pub async fn get_latency(&self, filter: &MetricsFilter) -> Result<MetricsLatency, ApiError> {
        let query = filter.to_query_pairs()?;
        self.fetch_json(self.client.get(self.url("/metrics/latency")).query(&query))
            .await
    }

    pub async fn get_logs(&self, query: &LogsQuery) -> Result<MetricsLogsPage, ApiError> {
        let pairs = query.to_query_pairs()?;
        self.fetch_json(self.client.get(self.url("/metrics/logs")).query(&pairs))
            .await
    }

    pub async fn get_throughput(&self, run_id: &str) -> Result<Vec<ThroughputPoint>, ApiError> {
        self.fetch_json(
            self.client
                .get(self.url("/metrics/throughput"))
                .query(&[("experimentRunId", run_id)]),
        )
        .await
    }

    pub async fn get_economic_defaults(&self) -> Result<EconomicImpactDefaults, ApiError> {
        self.fetch_json(self.client.get(self.url("/metrics/economic/defaults")))
            .await
    }

    pub async fn list_experiments(&self) -> Result<Vec<ExperimentRun>, ApiError> {
        self.fetch_json(self.client.get(self.url("/experiments")))
            .await
    }

    pub async fn get_experiment(&self, id: &str) -> Result<ExperimentRun, ApiError> {
        self.fetch_json(self.client.get(self.url(&format!("/experiments/{id}"))))
            .await
    }

    pub async fn create_experiment(
        &self,
        request: &CreateExperiment,
    ) -> Result<ExperimentRun, ApiError> {
        self.fetch_json(self.client.post(self.url("/experiments")).json(request))
            .await
    }

    /// Triggers a run. `dryRun` is only sent when requested.
    pub async fn run_experiment(&self, id: &str, dry_run: bool) -> Result<ActionAck, ApiError> {
        let mut builder = self.client.post(self.url(&format!("/experiments/{id}/run")));
        if dry_run {
            builder = builder.query(&[("dryRun", "true")]);
        }
        self.fetch_json(builder).await
    }

    pub async fn delete_experiment(&self, id: &str) -> Result<ActionAck, ApiError> {
        self.fetch_json(self.client.delete(self.url(&format!("/experiments/{id}"))))
            .await
    }

    /// Raw export blob as served; callers reformat it.
    pub async fn export_experiment(
        &self,
        id: &str,
        format: ExportFormat,
    ) -> Result<String, ApiError> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/experiments/{id}/export")))
                    .query(&[("format", format.as_str())]),
            )
            .await?;
        response
            .text()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))
    }

    pub async fn get_hearing(&self, id: &str) -> Result<Hearing, ApiError> {
        self.fetch_json(self.client.get(self.url(&format!("/juicios/{id}"))))
            .await
    }
}

/// Readable message from a 4xx body. The backend sends `message` either as a string or as
/// a list of validation messages.
fn rejection_message(body: &str, status: StatusCode) -> String {
    let fallback = || {
        let text = body.trim();
        if text.is_empty() {
            status.canonical_reason().unwrap_or("request rejected").to_string()
        } else {
            text.to_string()
        }
    };

    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };
    match payload.get("message").or_else(|| payload.get("error")) {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Array(messages)) => messages
            .iter()
            .map(|message| match message {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => fallback(),
    }
}

/// Polls one experiment by id.
pub struct ExperimentSource {
    client: Arc<MetricsApiClient>,
    id: String,
}

impl ExperimentSource {
    pub fn new(client: Arc<MetricsApiClient>, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ExperimentSource {
    type Item = ExperimentRun;

    fn key(&self) -> CacheKey {
        CacheKey::Experiment(self.id.clone())
    }

    async fn fetch(&self) -> Result<ExperimentRun, ApiError> {
        self.client.get_experiment(&self.id).await
    }
}

/// Refreshes one hearing's detail view.
pub struct HearingSource {
    client: Arc<MetricsApiClient>,
    id: String,
}

impl HearingSource {
    pub fn new(client: Arc<MetricsApiClient>, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HearingSource {
    type Item = Hearing;

    fn key(&self) -> CacheKey {
        CacheKey::Hearing(self.id.clone())
    }

    async fn fetch(&self) -> Result<Hearing, ApiError> {
        self.client.get_hearing(&self.id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use warp::Filter;
    use warp::http::StatusCode as WarpStatus;

    use super::*;
    use crate::domain::channel::ChannelTarget;

    fn client_for(addr: std::net::SocketAddr) -> MetricsApiClient {
        let config = ConsoleConfig {
            base_url: format!("http://{addr}/"),
            ..ConsoleConfig::default()
        };
        MetricsApiClient::new(&config).unwrap()
    }

    #[test]
    fn rejection_message_joins_validation_lists() {
        let body = r#"{"statusCode":400,"message":["name should not be empty","concurrency must be positive"]}"#;
        assert_eq!(
            rejection_message(body, StatusCode::BAD_REQUEST),
            "name should not be empty; concurrency must be positive"
        );
        assert_eq!(
            rejection_message(r#"{"message":"already running"}"#, StatusCode::CONFLICT),
            "already running"
        );
        assert_eq!(rejection_message("", StatusCode::CONFLICT), "Conflict");
    }

    #[tokio::test]
    async fn not_found_and_server_errors_are_classified() {
        let missing = warp::path!("experiments" / String)
            .map(|_id: String| warp::reply::with_status("gone", WarpStatus::NOT_FOUND));
        let broken = warp::path!("juicios" / String).map(|_id: String| {
            warp::reply::with_status("boom", WarpStatus::SERVICE_UNAVAILABLE)
        });
        let (addr, server) =
            warp::serve(missing.or(broken)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = client_for(addr);
        assert!(matches!(
            client.get_experiment("exp-1").await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            client.get_hearing("h-1").await,
            Err(ApiError::Server(503))
        ));
    }

    #[tokio::test]
    async fn filters_are_sent_without_both_or_blanks() {
        let route = warp::path!("metrics" / "summary")
            .and(warp::query::<HashMap<String, String>>())
            .map(|query: HashMap<String, String>| {
                assert!(!query.contains_key("channel"));
                assert!(!query.contains_key("to"));
                assert_eq!(
                    query.get("from").map(String::as_str),
                    Some("2026-03-01T00:00:00.000Z")
                );
                warp::reply::json(&serde_json::json!({
                    "totalSent": 2,
                    "totalDelivered": 1,
                    "totalFailed": 1,
                    "successRate": 50.0,
                    "byChannel": []
                }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let filter = MetricsFilter {
            from: Some("2026-03-01".to_string()),
            to: Some(String::new()),
            channel: Some(ChannelTarget::Both),
            experiment_run_id: None,
        };
        let summary = client_for(addr).get_summary(&filter).await.unwrap();
        assert_eq!(summary.total_sent, 2);
    }

    #[tokio::test]
    async fn inconsistent_counts_are_a_schema_error() {
        let route = warp::path!("metrics" / "summary").map(|| {
            warp::reply::json(&serde_json::json!({
                "totalSent": 1,
                "totalDelivered": 2,
                "totalFailed": 0,
                "byChannel": []
            }))
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let result = client_for(addr).get_summary(&MetricsFilter::default()).await;
        assert!(matches!(result, Err(ApiError::Schema(_))));
    }

    #[tokio::test]
    async fn dry_run_flag_is_only_sent_when_set() {
        let route = warp::path!("experiments" / String / "run")
            .and(warp::post())
            .and(warp::query::<HashMap<String, String>>())
            .map(|id: String, query: HashMap<String, String>| {
                let message = match query.get("dryRun") {
                    Some(value) => format!("dry:{value}"),
                    None => "live".to_string(),
                };
                warp::reply::json(&serde_json::json!({ "message": message, "id": id }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = client_for(addr);
        let live = client.run_experiment("exp-1", false).await.unwrap();
        let dry = client.run_experiment("exp-1", true).await.unwrap();
        assert_eq!(live.message, "live");
        assert_eq!(dry.message, "dry:true");
        assert_eq!(dry.id, "exp-1");
    }

    #[tokio::test]
    async fn rejected_mutation_carries_backend_message() {
        let route = warp::path!("experiments").and(warp::post()).map(|| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "statusCode": 400,
                    "message": ["totalMessages must not be less than 1"]
                })),
                WarpStatus::BAD_REQUEST,
            )
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let request = CreateExperiment {
            name: "bad".to_string(),
            description: None,
            scenario: crate::domain::experiment::ExperimentScenario::Latency,
            channel_target: ChannelTarget::Email,
            total_messages: 0,
            concurrency: 1,
            rate_per_sec: None,
            dry_run: None,
            created_by: None,
        };
        match client_for(addr).create_experiment(&request).await {
            Err(ApiError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "totalMessages must not be less than 1");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::channel::ChannelTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentStatus {
    Created,
    Running,
    Done,
    Failed,
}

impl ExperimentStatus {
    /// `Done` and `Failed` are final; nothing moves an experiment out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExperimentStatus::Done | ExperimentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperimentStatus::Created => "CREATED",
            ExperimentStatus::Running => "RUNNING",
            ExperimentStatus::Done => "DONE",
            ExperimentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentScenario {
    Latency,
    Throughput,
    ErrorInjection,
}

impl ExperimentScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperimentScenario::Latency => "LATENCY",
            ExperimentScenario::Throughput => "THROUGHPUT",
            ExperimentScenario::ErrorInjection => "ERROR_INJECTION",
        }
    }
}

impl fmt::Display for ExperimentScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentScenario {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "LATENCY" => Ok(ExperimentScenario::Latency),
            "THROUGHPUT" => Ok(ExperimentScenario::Throughput),
            "ERROR_INJECTION" => Ok(ExperimentScenario::ErrorInjection),
            _ => Err(format!(
                "unknown scenario '{value}' (expected LATENCY, THROUGHPUT or ERROR_INJECTION)"
            )),
        }
    }
}

/// One time-offset bucket recorded by the backend while an experiment runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSeriesPoint {
    pub id: String,
    pub t_offset_sec: f64,
    pub sent_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub p95_latency_ms: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentRun {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scenario: ExperimentScenario,
    pub channel_target: ChannelTarget,
    pub total_messages: u64,
    pub concurrency: u32,
    #[serde(default)]
    pub rate_per_sec: Option<f64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: ExperimentStatus,
    #[serde(default)]
    pub summary_json: Option<Value>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub series_points: Vec<ExperimentSeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperiment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scenario: ExperimentScenario,
    pub channel_target: ChannelTarget,
    pub total_messages: u64,
    pub concurrency: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Acknowledgement returned by run and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    pub message: String,
    pub id: String,
}

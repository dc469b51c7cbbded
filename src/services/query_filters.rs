use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::channel::ChannelTarget;
use crate::domain::metrics::MetricStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid timestamp '{0}' (expected RFC 3339, YYYY-MM-DDTHH:MM or YYYY-MM-DD)")]
    InvalidTimestamp(String),
    #[error("local time '{0}' does not exist in the current time zone")]
    NonexistentLocalTime(String),
}

/// Filters shared by the summary, latency and logs endpoints, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_run_id: Option<String>,
}

impl MetricsFilter {
    /// Query pairs for transmission. Blank values are omitted rather than sent empty, and
    /// `BOTH` is omitted because the backend reports every channel by default.
    pub fn to_query_pairs(&self) -> Result<Vec<(&'static str, String)>, FilterError> {
        let mut pairs = Vec::new();
        if let Some(from) = normalize_timestamp(self.from.as_deref())? {
            pairs.push(("from", from));
        }
        if let Some(to) = normalize_timestamp(self.to.as_deref())? {
            pairs.push(("to", to));
        }
        if let Some(channel) = self.channel.and_then(|target| target.channel()) {
            pairs.push(("channel", channel.as_str().to_string()));
        }
        if let Some(run_id) = non_blank(self.experiment_run_id.as_deref()) {
            pairs.push(("experimentRunId", run_id.to_string()));
        }
        Ok(pairs)
    }
}

/// Logs query: the shared filters plus status, free-text search and pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct LogsQuery {
    pub filter: MetricsFilter,
    pub status: Option<MetricStatus>,
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl LogsQuery {
    pub fn new(filter: MetricsFilter, page: u32, page_size: u32) -> Self {
        Self {
            filter,
            status: None,
            search: None,
            page,
            page_size,
        }
    }

    pub fn to_query_pairs(&self) -> Result<Vec<(&'static str, String)>, FilterError> {
        let mut pairs = self.filter.to_query_pairs()?;
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(search) = non_blank(self.search.as_deref()) {
            pairs.push(("q", search.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("pageSize", self.page_size.to_string()));
        Ok(pairs)
    }
}

/// Normalizes a user-entered date filter to a full ISO-8601 UTC timestamp.
///
/// - blank or missing => `None` (the filter is omitted)
/// - RFC 3339 with offset => converted to UTC
/// - `YYYY-MM-DDTHH:MM[:SS]` without offset => interpreted in the local time zone
/// - `YYYY-MM-DD` => midnight UTC
pub fn normalize_timestamp(raw: Option<&str>) -> Result<Option<String>, FilterError> {
    let Some(text) = non_blank(raw) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(format_utc(parsed.with_timezone(&Utc))));
    }

    if text.contains('T') {
        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
            .map_err(|_| FilterError::InvalidTimestamp(text.to_string()))?;
        let local = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| FilterError::NonexistentLocalTime(text.to_string()))?;
        return Ok(Some(format_utc(local.with_timezone(&Utc))));
    }

    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| FilterError::InvalidTimestamp(text.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| FilterError::InvalidTimestamp(text.to_string()))?;
    Ok(Some(format_utc(midnight.and_utc())))
}

fn format_utc(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

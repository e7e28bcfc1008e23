//! Record-source boundary: where raw backend rows come from.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{AdboardError, AdboardResult};
use crate::types::{parse_record_date, RawRecord};

/// Server-side filter sent with every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchQuery {
    pub franchise: Option<String>,
    pub account_id: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl FetchQuery {
    /// Whether a raw row satisfies this query. Date bounds are inclusive;
    /// rows without a usable date only pass an unbounded query.
    pub fn matches(&self, raw: &RawRecord) -> bool {
        if let Some(franchise) = &self.franchise {
            if !eq_trimmed(raw.franqueado.as_deref(), franchise) {
                return false;
            }
        }
        if let Some(account_id) = &self.account_id {
            if !eq_trimmed(raw.account_id.as_deref(), account_id) {
                return false;
            }
        }
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(date) = raw.date_start.as_deref().and_then(parse_record_date) else {
            return false;
        };
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

fn eq_trimmed(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.trim().to_lowercase() == expected.trim().to_lowercase())
}

/// A backend that delivers raw ad-performance rows.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, query: &FetchQuery) -> AdboardResult<Vec<RawRecord>>;
}

/// Reads a JSON array of backend rows from disk and applies the query
/// locally.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "JSON record source configured");
        Self { path }
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn fetch(&self, query: &FetchQuery) -> AdboardResult<Vec<RawRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            AdboardError::Source(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let rows: Vec<RawRecord> = serde_json::from_slice(&bytes)?;
        let total = rows.len();
        let matching: Vec<RawRecord> = rows.into_iter().filter(|r| query.matches(r)).collect();
        debug!(
            path = %self.path.display(),
            total,
            matching = matching.len(),
            "Fetched rows from JSON file"
        );
        Ok(matching)
    }
}

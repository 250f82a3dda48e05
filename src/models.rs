//! Core data models used throughout transit-sync.
//!
//! These types represent the records, sync outcomes, and search results that
//! flow through the ingestion and query pipeline.

use serde::Serialize;

/// Transient record produced by the normalizer before persistence.
///
/// `source_key` is unique within one ingestion generation; `payload` is the
/// element serialized back to JSON text; `updated_at` is the generation's
/// shared ingestion timestamp (ISO-8601), not a time taken from the record.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub source_key: String,
    pub payload: String,
    pub updated_at: String,
}

/// A record as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub source_key: String,
    pub payload: String,
    pub updated_at: String,
}

/// Result status of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
    Skipped,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
            SyncStatus::Skipped => "skipped",
        }
    }
}

/// Outcome of one `run_sync` invocation. Appended to the audit trail for
/// every non-skipped run and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    #[serde(rename = "recordCount")]
    pub record_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "ranAt")]
    pub ran_at: String,
}

/// A persisted audit row, as read back from `sync_runs`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRunRow {
    pub id: i64,
    pub ran_at: String,
    pub status: String,
    pub record_count: i64,
    pub message: Option<String>,
}

/// One ranked record in a route search response.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub id: i64,
    #[serde(rename = "sourceKey")]
    pub source_key: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    /// Time extracted from the payload, falling back to the ingestion
    /// timestamp; `None` when neither parsed.
    #[serde(rename = "recordTime")]
    pub record_time: Option<String>,
    #[serde(rename = "deltaSeconds")]
    pub delta_seconds: Option<i64>,
    pub payload: serde_json::Value,
}

/// Full response of the ranking engine.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSearchResponse {
    pub route: String,
    #[serde(rename = "requestedAt")]
    pub requested_at: String,
    #[serde(rename = "totalMatches")]
    pub total_matches: usize,
    #[serde(rename = "bestMatch")]
    pub best_match: MatchCandidate,
    pub matches: Vec<MatchCandidate>,
}

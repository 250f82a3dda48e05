//! Time-nearest route ranking.
//!
//! Filters stored records by route match and orders them by absolute time
//! distance to the query instant. Matching is schema-agnostic: a record
//! matches when any scanned route-alias candidate normalizes to the query
//! route, and its time is the first time-alias candidate that parses,
//! falling back to the ingestion timestamp.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{MatchCandidate, RouteSearchResponse, StoredRecord};
use crate::scan;
use crate::store;
use crate::value;

/// True when any route-alias candidate in the payload normalizes to
/// `normalized_route`. Matching is not limited to a designated primary
/// field; any nested field under any alias counts.
pub fn route_matches(payload: &Value, normalized_route: &str) -> bool {
    scan::find_values_by_key(payload, scan::ROUTE_ALIASES, scan::MAX_SCAN_DEPTH)
        .iter()
        .any(|candidate| value::normalize_route(candidate) == normalized_route)
}

/// The record's temporal position: first parseable time-alias candidate,
/// else the ingestion timestamp, else undated.
pub fn record_time(payload: &Value, updated_at: &str) -> Option<DateTime<Utc>> {
    for candidate in scan::find_values_by_key(payload, scan::TIME_ALIASES, scan::MAX_SCAN_DEPTH) {
        if let Some(parsed) = value::parse_timestamp(candidate) {
            return Some(parsed);
        }
    }

    value::parse_timestamp_str(updated_at)
}

/// Ranks `records` for `route` around the instant `at`.
///
/// Undated records sort last with a `None` delta; they are included in the
/// ranking, never ahead of dated ones. The ranked list exposed in the
/// response is capped at `match_limit`; `total_matches` counts all of them.
pub fn rank(
    records: &[StoredRecord],
    route: &str,
    at: DateTime<Utc>,
    match_limit: usize,
) -> Result<RouteSearchResponse> {
    let normalized_route = value::normalize_route_str(route);
    if normalized_route.is_empty() {
        return Err(Error::Config("route must not be empty".to_string()));
    }

    let mut ranked: Vec<MatchCandidate> = Vec::new();
    for record in records {
        let payload: Value = serde_json::from_str(&record.payload).unwrap_or(Value::Null);
        if !route_matches(&payload, &normalized_route) {
            continue;
        }

        let time = record_time(&payload, &record.updated_at);
        let delta_seconds = time.map(|t| {
            let millis = (t - at).num_milliseconds().abs();
            (millis as f64 / 1000.0).round() as i64
        });

        ranked.push(MatchCandidate {
            id: record.id,
            source_key: record.source_key.clone(),
            updated_at: record.updated_at.clone(),
            record_time: time.map(value::format_iso),
            delta_seconds,
            payload,
        });
    }

    if ranked.is_empty() {
        return Err(Error::NotFound {
            route: normalized_route,
        });
    }

    // Stable sort: equal deltas keep their original (newest-first) order.
    ranked.sort_by_key(|candidate| candidate.delta_seconds.unwrap_or(i64::MAX));

    let total_matches = ranked.len();
    let best_match = ranked[0].clone();
    ranked.truncate(match_limit);

    Ok(RouteSearchResponse {
        route: normalized_route,
        requested_at: value::format_iso(at),
        total_matches,
        best_match,
        matches: ranked,
    })
}

/// Query entry point over the store: reads the newest scan window and ranks
/// it.
pub async fn search_routes(
    config: &Config,
    pool: &SqlitePool,
    route: &str,
    at: DateTime<Utc>,
    limit: Option<usize>,
) -> Result<RouteSearchResponse> {
    let records = store::list_recent(pool, config.search.max_scan_rows).await?;
    rank(
        &records,
        route,
        at,
        limit.unwrap_or(config.search.match_limit),
    )
}

/// CLI entry point — runs a search and prints the ranking.
pub async fn run_search(
    config: &Config,
    pool: &SqlitePool,
    route: &str,
    at: Option<String>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let at = match at {
        Some(raw) => value::parse_timestamp_str(&raw)
            .ok_or_else(|| anyhow::anyhow!("--at must be a valid date/time: {}", raw))?,
        None => Utc::now(),
    };

    match search_routes(config, pool, route, at, limit).await {
        Ok(response) => {
            println!(
                "route {} at {} — {} match(es)",
                response.route, response.requested_at, response.total_matches
            );
            for (i, candidate) in response.matches.iter().enumerate() {
                let delta = candidate
                    .delta_seconds
                    .map(|d| format!("{}s", d))
                    .unwrap_or_else(|| "undated".to_string());
                println!(
                    "{}. [{}] {} record_time: {}",
                    i + 1,
                    delta,
                    candidate.source_key,
                    candidate.record_time.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Err(Error::NotFound { route }) => {
            println!("No records found for route {}", route);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

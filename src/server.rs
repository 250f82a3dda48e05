//! HTTP API over the query engine and the sync orchestrator.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/route-search?route=R[&at=T]` | Time-nearest ranking for a route |
//! | `GET`  | `/records?limit=N` | Newest-first stored records |
//! | `GET`  | `/records/{source_key}` | One record by key |
//! | `POST` | `/sync/run` | Trigger an ingestion run now |
//! | `GET`  | `/sync/status` | Latest sync audit entry |
//! | `GET`  | `/health` | Health check with latest sync info |
//!
//! # Error Contract
//!
//! Error responses all carry the same body shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query parameter \"route\" is required" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `upstream_error` (502),
//! `invalid_data` (502), `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::Error;
use crate::models::{SyncOutcome, SyncRunRow};
use crate::search;
use crate::store;
use crate::sync;
use crate::value;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
}

/// Starts the HTTP server and the background sync scheduler. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config, pool: SqlitePool) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    // Initial sync is non-fatal: a dead source at startup still leaves the
    // server answering queries over the prior generation.
    match sync::run_sync(&config, &pool).await {
        Ok(outcome) => info!(status = outcome.status.as_str(), records = outcome.record_count, "initial sync"),
        Err(e) => tracing::error!(error = %e, "initial sync failed"),
    }

    sync::start_scheduler(config.clone(), pool.clone());

    let state = AppState { config, pool };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/route-search", get(handle_route_search))
        .route("/records", get(handle_list_records))
        .route("/records/{source_key}", get(handle_get_record))
        .route("/sync/run", post(handle_sync_run))
        .route("/sync/status", get(handle_sync_status))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(bind = %bind_addr, "server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Config(_) => bad_request(message),
            Error::NotFound { .. } => not_found(message),
            Error::Fetch { .. } | Error::Protocol(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error".to_string(),
                message,
            },
            Error::Parse { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "invalid_data".to_string(),
                message,
            },
            Error::Db(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message,
            },
        }
    }
}

// ============ GET /route-search ============

#[derive(Deserialize)]
struct RouteSearchParams {
    route: Option<String>,
    at: Option<String>,
    limit: Option<usize>,
}

async fn handle_route_search(
    State(state): State<AppState>,
    Query(params): Query<RouteSearchParams>,
) -> Result<Json<crate::models::RouteSearchResponse>, AppError> {
    let route = params
        .route
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| bad_request("query parameter \"route\" is required"))?;

    let at = match params.at.as_deref() {
        Some(raw) => value::parse_timestamp_str(raw)
            .ok_or_else(|| bad_request("query parameter \"at\" must be a valid date/time"))?,
        None => Utc::now(),
    };

    let response =
        search::search_routes(&state.config, &state.pool, route, at, params.limit).await?;
    Ok(Json(response))
}

// ============ GET /records ============

#[derive(Deserialize)]
struct RecordsParams {
    limit: Option<i64>,
}

async fn handle_list_records(
    State(state): State<AppState>,
    Query(params): Query<RecordsParams>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let records = store::list_recent(&state.pool, limit).await?;

    Ok(Json(records.iter().map(record_to_json).collect()))
}

async fn handle_get_record(
    State(state): State<AppState>,
    Path(source_key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = store::get_by_key(&state.pool, &source_key)
        .await?
        .ok_or_else(|| not_found("Record not found"))?;

    Ok(Json(record_to_json(&record)))
}

/// Response shape with the payload parsed back into JSON; a payload that no
/// longer parses is passed through as the raw string.
fn record_to_json(record: &crate::models::StoredRecord) -> serde_json::Value {
    let payload = serde_json::from_str(&record.payload)
        .unwrap_or_else(|_| serde_json::Value::String(record.payload.clone()));
    serde_json::json!({
        "id": record.id,
        "sourceKey": record.source_key,
        "updatedAt": record.updated_at,
        "payload": payload,
    })
}

// ============ POST /sync/run ============

async fn handle_sync_run(State(state): State<AppState>) -> Result<Json<SyncOutcome>, AppError> {
    let outcome = sync::run_sync(&state.config, &state.pool).await?;
    Ok(Json(outcome))
}

// ============ GET /sync/status ============

async fn handle_sync_status(
    State(state): State<AppState>,
) -> Result<Json<SyncRunRow>, AppError> {
    let latest = store::latest_run(&state.pool)
        .await?
        .ok_or_else(|| not_found("No sync run recorded yet"))?;
    Ok(Json(latest))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    source: String,
    #[serde(rename = "latestSync")]
    latest_sync: Option<SyncRunRow>,
    timestamp: String,
}

async fn handle_health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, AppError> {
    let latest_sync = store::latest_run(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        source: state.config.source.descriptor.clone(),
        latest_sync,
        timestamp: value::now_iso(),
    }))
}

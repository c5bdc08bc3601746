//! Collector HTTP API.
//!
//! - `POST /api/prediction`: ingest one record
//! - `GET  /api/predictions`: full history, arrival order
//! - `GET  /api/predictions.csv`: history as CSV
//! - `GET  /api/latest`: most recent record
//! - `GET  /api/categories`: knowledge base table
//! - `GET  /api/health`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cotton_core::{obs, KnowledgeBase, KnowledgeEntry, Record, ValidationError, METRICS};
use cotton_history::StorageError;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::collector::IngestError;
use crate::export::records_to_csv;
use crate::server::AppState;

type AppStateArc = Arc<AppState>;

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "status": "error", "message": message.into() })),
    )
        .into_response()
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        match self {
            IngestError::BadRequest(err) => error_body(StatusCode::BAD_REQUEST, err.to_string()),
            IngestError::Storage(err) => {
                error!(error = %err, "ingest failed in storage");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

fn storage_failure(err: StorageError) -> Response {
    error!(error = %err, "history read failed");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

// ============================================================================
// Ingestion
// ============================================================================

pub fn ingest_routes() -> Router<AppStateArc> {
    Router::new().route("/api/prediction", post(receive_prediction))
}

async fn receive_prediction(
    State(state): State<AppStateArc>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, IngestError> {
    let Json(payload) = payload.map_err(|rejection| {
        let err = ValidationError::Malformed(rejection.body_text());
        METRICS.inc_rejected();
        obs::emit_record_rejected(&err);
        IngestError::BadRequest(err)
    })?;

    state.collector.ingest(payload).await?;
    Ok(Json(
        json!({ "status": "success", "message": "Prediction received" }),
    ))
}

// ============================================================================
// History reads
// ============================================================================

#[derive(Serialize)]
struct PredictionsResponse {
    predictions: Vec<Record>,
}

pub fn history_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/predictions", get(list_predictions))
        .route("/api/predictions.csv", get(export_csv))
        .route("/api/latest", get(latest_prediction))
}

async fn list_predictions(State(state): State<AppStateArc>) -> Response {
    match state.collector.all().await {
        Ok(predictions) => Json(PredictionsResponse { predictions }).into_response(),
        Err(err) => storage_failure(err),
    }
}

async fn latest_prediction(State(state): State<AppStateArc>) -> Response {
    match state.collector.latest().await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => Json(json!({ "message": "No predictions available" })).into_response(),
        Err(err) => storage_failure(err),
    }
}

async fn export_csv(State(state): State<AppStateArc>) -> Response {
    match state.collector.all().await {
        Ok(records) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"cotton_disease_history.csv\"",
                ),
            ],
            records_to_csv(&records),
        )
            .into_response(),
        Err(err) => storage_failure(err),
    }
}

// ============================================================================
// Knowledge base & health
// ============================================================================

pub fn info_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/health", get(health))
}

async fn list_categories() -> Json<Vec<KnowledgeEntry>> {
    Json(KnowledgeBase::new().categories())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    records: u64,
    backend: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

async fn health(State(state): State<AppStateArc>) -> Response {
    match state.collector.len().await {
        Ok(records) => Json(HealthResponse {
            status: "ok",
            records,
            backend: state.collector.backend(),
            version: cotton_core::VERSION,
            uptime_secs: state.start_time.elapsed().as_secs(),
        })
        .into_response(),
        Err(err) => storage_failure(err),
    }
}

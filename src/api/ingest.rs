//! Ingestion API endpoints
//!
//! All routes require authentication.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;

use super::dto::{IngestRequest, IngestResponse, SampleResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::sample_batch;

/// Routes:
/// - POST / - Ingest a batch
/// - GET /sample - Demonstration batch
pub fn ingest_router() -> Router<AppState> {
    Router::new()
        .route("/", post(ingest))
        .route("/sample", get(sample))
}

/// POST /api/v1/ingest
async fn ingest(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    tracing::debug!(user_id = %user.user_id, query = %req.query, "Ingest requested");

    let report = state.ingest.ingest(&req.query, &req.raw_data()).await?;
    Ok(Json(IngestResponse::from(report)))
}

/// GET /api/v1/ingest/sample
async fn sample(CurrentUser(_user): CurrentUser) -> Result<Json<SampleResponse>, AppError> {
    let data = serde_json::to_string_pretty(&sample_batch(Utc::now()))
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(SampleResponse { data }))
}

//! API layer
//!
//! JSON handlers for:
//! - Auth (sign up, sign in, sign out, current session)
//! - Ingestion
//! - Post search and recent topics
//! - Metrics (Prometheus)

mod auth;
mod dto;
mod ingest;
pub mod metrics;
mod posts;

pub use dto::*;
pub use metrics::metrics_router;

use axum::Router;

use crate::AppState;

/// Create the `/api/v1` router
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_api_router())
        .nest("/ingest", ingest::ingest_router())
        .merge(posts::posts_router())
}

//! Server-rendered pages
//!
//! Anonymous visitors are redirected to `/login`.

mod admin;
mod dashboard;
pub mod layout;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::MaybeUser;

pub use admin::RECENT_TOPICS_LIMIT;
pub use dashboard::LANGUAGES;

/// Create page router
///
/// Routes:
/// - GET / - Redirect to dashboard or login
/// - GET /dashboard - Search posts
/// - GET /admin - Ingestion form and recent topics
/// - POST /admin/ingest - Submit ingestion form
pub fn web_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/admin", get(admin::admin_page))
        .route("/admin/ingest", post(admin::admin_ingest))
}

async fn index(MaybeUser(session): MaybeUser) -> Redirect {
    match session {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

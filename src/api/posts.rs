//! Post search and topic listing endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use super::dto::SearchParams;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Topic;
use crate::error::AppError;
use crate::service::SearchPage;
use crate::web::RECENT_TOPICS_LIMIT;

/// Routes:
/// - GET /posts - Filtered, paginated search
/// - GET /topics - Most recent topics
pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(search_posts))
        .route("/topics", get(recent_topics))
}

/// GET /api/v1/posts
async fn search_posts(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, AppError> {
    let page = state.search.search(&params.filters(), params.page()).await?;
    Ok(Json(page))
}

/// GET /api/v1/topics
async fn recent_topics(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Vec<Topic>>, AppError> {
    let topics = state.db.get_recent_topics(RECENT_TOPICS_LIMIT).await?;
    Ok(Json(topics))
}

//! Auth API endpoints

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;

use super::dto::{AuthResponse, CredentialsRequest, SessionResponse, UserResponse};
use crate::AppState;
use crate::auth::{MaybeUser, build_session_cookie, clear_session_cookie};
use crate::error::AppError;
use crate::service::IssuedSession;

/// Routes:
/// - POST /sign_up
/// - POST /sign_in
/// - POST /sign_out
/// - GET /session
pub fn auth_api_router() -> Router<AppState> {
    Router::new()
        .route("/sign_up", post(sign_up))
        .route("/sign_in", post(sign_in))
        .route("/sign_out", post(sign_out))
        .route("/session", get(current_session))
}

fn issued_response(state: &AppState, jar: CookieJar, issued: IssuedSession) -> Response {
    let body = AuthResponse::from(&issued);
    let cookie = build_session_cookie(issued.token, state.config.should_use_secure_cookies());
    (jar.add(cookie), Json(body)).into_response()
}

/// POST /api/v1/auth/sign_up
async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let issued = state.auth.sign_up(&req.email, &req.password).await?;
    Ok(issued_response(&state, jar, issued))
}

/// POST /api/v1/auth/sign_in
async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let issued = state.auth.sign_in(&req.email, &req.password).await?;
    Ok(issued_response(&state, jar, issued))
}

/// POST /api/v1/auth/sign_out
async fn sign_out(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    jar: CookieJar,
) -> impl IntoResponse {
    state.auth.sign_out(session.as_ref());
    (
        jar.add(clear_session_cookie()),
        Json(serde_json::json!({ "success": true })),
    )
}

/// GET /api/v1/auth/session
async fn current_session(MaybeUser(session): MaybeUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: session.as_ref().map(UserResponse::from),
    })
}

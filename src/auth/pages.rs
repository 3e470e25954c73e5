//! Login, signup and logout pages
//!
//! Successful sign-in or sign-up sets the session cookie and redirects to
//! the dashboard. Failures re-render the form with the error.

use axum::{
    Form, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::middleware::MaybeUser;
use super::session::{build_session_cookie, clear_session_cookie};
use crate::AppState;
use crate::error::AppError;
use crate::service::IssuedSession;
use crate::web::layout::{NavItem, Notice, attr, render_page};

/// Create authentication page router
///
/// Routes:
/// - GET/POST /login - Sign in
/// - GET/POST /signup - Create account
/// - POST /logout - Clear session
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct CredentialsForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Clone, Copy)]
enum AuthForm {
    Login,
    Signup,
}

impl AuthForm {
    fn title(self) -> &'static str {
        match self {
            AuthForm::Login => "Sign in",
            AuthForm::Signup => "Sign up",
        }
    }

    fn action(self) -> &'static str {
        match self {
            AuthForm::Login => "/login",
            AuthForm::Signup => "/signup",
        }
    }

    fn alternate(self) -> &'static str {
        match self {
            AuthForm::Login => r#"<p>No account? <a href="/signup">Sign up</a></p>"#,
            AuthForm::Signup => r#"<p>Already registered? <a href="/login">Sign in</a></p>"#,
        }
    }
}

fn render_form(form: AuthForm, email: &str, notice: Option<Notice>) -> Html<String> {
    let body = format!(
        r#"<h1>{}</h1>
{}
<form method="post" action="{}">
  <p><label>Email <input type="email" name="email" value="{}" required /></label></p>
  <p><label>Password <input type="password" name="password" minlength="6" required /></label></p>
  <p><button type="submit">{}</button></p>
</form>
{}"#,
        form.title(),
        notice.map(|n| n.render()).unwrap_or_default(),
        form.action(),
        attr(email),
        form.title(),
        form.alternate()
    );

    Html(render_page(form.title(), None, NavItem::None, &body))
}

fn signed_in(state: &AppState, jar: CookieJar, issued: IssuedSession) -> Response {
    let cookie = build_session_cookie(issued.token, state.config.should_use_secure_cookies());
    (jar.add(cookie), Redirect::to("/dashboard")).into_response()
}

/// GET /login
async fn login_page(MaybeUser(session): MaybeUser) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    render_form(AuthForm::Login, "", None).into_response()
}

/// POST /login
async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state.auth.sign_in(&form.email, &form.password).await {
        Ok(issued) => signed_in(&state, jar, issued),
        Err(error) => {
            let notice = Notice::Error(error.user_message());
            render_form(AuthForm::Login, &form.email, Some(notice)).into_response()
        }
    }
}

/// GET /signup
async fn signup_page(State(state): State<AppState>, MaybeUser(session): MaybeUser) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let notice = (!state.auth.signup_allowed())
        .then(|| Notice::Error("Sign-up is disabled on this server".to_string()));
    render_form(AuthForm::Signup, "", notice).into_response()
}

/// POST /signup
async fn signup_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state.auth.sign_up(&form.email, &form.password).await {
        Ok(issued) => signed_in(&state, jar, issued),
        Err(AppError::Forbidden) => {
            let notice = Notice::Error("Sign-up is disabled on this server".to_string());
            render_form(AuthForm::Signup, &form.email, Some(notice)).into_response()
        }
        Err(error) => {
            let notice = Notice::Error(error.user_message());
            render_form(AuthForm::Signup, &form.email, Some(notice)).into_response()
        }
    }
}

/// POST /logout
///
/// Clears session cookie and redirects to login.
async fn logout(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    jar: CookieJar,
) -> Response {
    state.auth.sign_out(session.as_ref());
    (jar.add(clear_session_cookie()), Redirect::to("/login")).into_response()
}

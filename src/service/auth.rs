//! Auth service
//!
//! Email + password accounts backed by the users table. Sessions are
//! stateless signed tokens, so signing out only drops the client's token.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{Session, create_session_token, hash_password, verify_password};
use crate::config::AuthConfig;
use crate::data::{Database, EntityId, User};
use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 6;

/// A freshly issued session with its signed token
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    pub token: String,
}

/// Auth service
pub struct AuthService {
    db: Arc<Database>,
    config: AuthConfig,
}

impl AuthService {
    /// Create new auth service
    pub fn new(db: Arc<Database>, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Whether self-service registration is enabled
    pub fn signup_allowed(&self) -> bool {
        self.config.allow_signup
    }

    /// Register a new account and start a session for it
    ///
    /// # Errors
    /// * `Forbidden` when registration is disabled
    /// * `Validation` for a malformed email or short password
    /// * `Unprocessable` when the email is already registered
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        if !self.config.allow_signup {
            return Err(AppError::Forbidden);
        }

        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let rounds = self.config.password_hash_rounds;
        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, rounds))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let user = User {
            id: EntityId::new().0,
            email,
            password_hash,
            created_at: Utc::now(),
        };

        match self.db.insert_user(&user).await {
            Ok(()) => {}
            Err(error) if error.is_unique_violation() => {
                return Err(AppError::Unprocessable(
                    "User already registered".to_string(),
                ));
            }
            Err(error) => return Err(error),
        }

        tracing::info!(user_id = %user.id, "User registered");
        self.issue(&user)
    }

    /// Check credentials and start a session
    ///
    /// Unknown emails and wrong passwords are indistinguishable to callers.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.db.get_user_by_email(&email).await? else {
            tracing::debug!("Sign-in for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let stored = user.password_hash.clone();
        let password = password.to_owned();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        if !valid {
            tracing::debug!(user_id = %user.id, "Sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User signed in");
        self.issue(&user)
    }

    /// End a session
    pub fn sign_out(&self, session: Option<&Session>) {
        if let Some(session) = session {
            tracing::info!(user_id = %session.user_id, "User signed out");
        }
    }

    fn issue(&self, user: &User) -> Result<IssuedSession, AppError> {
        let session = Session::for_user(user, self.config.session_max_age);
        let token = create_session_token(&session, &self.config.session_secret)?;
        Ok(IssuedSession { session, token })
    }
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(
            "Unable to validate email address: invalid format".to_string(),
        ))
    }
}

//! Email + password authentication
//!
//! Handles:
//! - Password hashing
//! - Session management
//! - Authentication middleware and extractors
//! - Login/signup/logout pages

mod middleware;
mod pages;
pub mod password;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser, require_auth};
pub use pages::auth_router;
pub use password::{hash_password, verify_password};
pub use session::{
    SESSION_COOKIE, Session, build_session_cookie, clear_session_cookie, create_session_token,
    verify_session_token,
};

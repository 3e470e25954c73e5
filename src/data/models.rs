//! Data models
//!
//! Rust structs representing database rows.
//! Generated IDs use ULID and timestamps use chrono.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User (credentials)
// =============================================================================

/// A registered user of the query console
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Lowercased email address
    pub email: String,
    /// PBKDF2 hash, see `auth::password`
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Topic
// =============================================================================

/// A labeled ingestion batch
///
/// `tweet_count` is the length of the submitted array, not the number of
/// posts that were actually stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub topic_id: String,
    pub query: String,
    pub run_at: DateTime<Utc>,
    pub tweet_count: i64,
}

// =============================================================================
// Author
// =============================================================================

/// A post author keyed by the platform user id
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub user_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub followers_count: i64,
    pub verified: bool,
}

// =============================================================================
// Post
// =============================================================================

/// A post keyed by the platform tweet id
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub tweet_id: String,
    pub user_id: String,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Language code (ISO 639-1), "en" unless supplied
    pub lang: String,
    pub like_count: i64,
    pub retweet_count: i64,
    pub reply_count: i64,
    pub quote_count: i64,
}

/// A hashtag row; several rows may carry the same (post_id, tag) pair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Hashtag {
    pub id: i64,
    pub post_id: String,
    pub tag: String,
}

/// A (topic, post) membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopicPost {
    pub id: i64,
    pub topic_id: String,
    pub post_id: String,
}

// =============================================================================
// Search results
// =============================================================================

/// Author fields shown next to a post in search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub verified: bool,
}

/// A post joined with its author and hashtags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorSummary>,
    pub hashtags: Vec<String>,
}

/// Row shape of the posts ⟕ authors page query
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostAuthorRow {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub author_verified: Option<bool>,
}

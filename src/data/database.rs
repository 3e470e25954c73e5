//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime-checked queries and embedded migrations.

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use super::query::PostQuery;
use crate::error::AppError;
use crate::metrics::observe_db_query;

/// Database connection pool wrapper.
pub struct Database {
    pub(super) pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    ///
    /// Fails with a unique violation if the email is already registered.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        observe_db_query("insert", "users");
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a user by (lowercased) email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        observe_db_query("select", "users");
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Look up a user by id
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        observe_db_query("select", "users");
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // =========================================================================
    // Topics
    // =========================================================================

    /// Create a topic for an ingestion batch
    ///
    /// # Arguments
    /// * `query` - Label of the batch
    /// * `tweet_count` - Number of elements submitted in the batch
    pub async fn insert_topic(&self, query: &str, tweet_count: i64) -> Result<Topic, AppError> {
        observe_db_query("insert", "topics");
        let topic = Topic {
            topic_id: EntityId::new().0,
            query: query.to_string(),
            run_at: Utc::now(),
            tweet_count,
        };

        sqlx::query(
            r#"
            INSERT INTO topics (topic_id, query, run_at, tweet_count)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&topic.topic_id)
        .bind(&topic.query)
        .bind(topic.run_at)
        .bind(topic.tweet_count)
        .execute(&self.pool)
        .await?;

        Ok(topic)
    }

    pub async fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, AppError> {
        observe_db_query("select", "topics");
        let topic = sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE topic_id = ?")
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(topic)
    }

    /// Most recent topics, newest run first
    pub async fn get_recent_topics(&self, limit: usize) -> Result<Vec<Topic>, AppError> {
        observe_db_query("select", "topics");
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT * FROM topics
            ORDER BY run_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(topics)
    }

    pub async fn count_topics(&self) -> Result<i64, AppError> {
        observe_db_query("count", "topics");
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM topics")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Authors
    // =========================================================================

    /// Insert or update an author keyed by `user_id`; the latest write wins
    pub async fn upsert_author(&self, author: &Author) -> Result<(), AppError> {
        observe_db_query("upsert", "authors");
        sqlx::query(
            r#"
            INSERT INTO authors (
                user_id, username, display_name, created_at, followers_count, verified
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                created_at = excluded.created_at,
                followers_count = excluded.followers_count,
                verified = excluded.verified
            "#,
        )
        .bind(&author.user_id)
        .bind(&author.username)
        .bind(&author.display_name)
        .bind(author.created_at)
        .bind(author.followers_count)
        .bind(author.verified)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_author(&self, user_id: &str) -> Result<Option<Author>, AppError> {
        observe_db_query("select", "authors");
        let author = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(author)
    }

    /// Whether any author's username contains `needle` (case-insensitive)
    pub async fn author_username_matches(&self, needle: &str) -> Result<bool, AppError> {
        observe_db_query("select", "authors");
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM authors WHERE username LIKE ? ESCAPE '\')
            "#,
        )
        .bind(super::query::contains_pattern(needle))
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert or update a post keyed by `tweet_id`; the latest write wins
    pub async fn upsert_post(&self, post: &Post) -> Result<(), AppError> {
        observe_db_query("upsert", "posts");
        sqlx::query(
            r#"
            INSERT INTO posts (
                tweet_id, user_id, text, created_at, lang,
                like_count, retweet_count, reply_count, quote_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tweet_id) DO UPDATE SET
                user_id = excluded.user_id,
                text = excluded.text,
                created_at = excluded.created_at,
                lang = excluded.lang,
                like_count = excluded.like_count,
                retweet_count = excluded.retweet_count,
                reply_count = excluded.reply_count,
                quote_count = excluded.quote_count
            "#,
        )
        .bind(&post.tweet_id)
        .bind(&post.user_id)
        .bind(&post.text)
        .bind(post.created_at)
        .bind(&post.lang)
        .bind(post.like_count)
        .bind(post.retweet_count)
        .bind(post.reply_count)
        .bind(post.quote_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_post(&self, tweet_id: &str) -> Result<Option<Post>, AppError> {
        observe_db_query("select", "posts");
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE tweet_id = ?")
            .bind(tweet_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Count posts matching the query's predicates (ignores paging)
    pub async fn count_posts(&self, query: &PostQuery) -> Result<i64, AppError> {
        observe_db_query("count", "posts");
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
        query.push_where(&mut builder);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Fetch one page of posts, newest first, joined with author and hashtags
    pub async fn fetch_post_page(
        &self,
        query: &PostQuery,
    ) -> Result<Vec<PostWithRelations>, AppError> {
        observe_db_query("select", "posts");
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                p.tweet_id, p.user_id, p.text, p.created_at, p.lang,
                p.like_count, p.retweet_count, p.reply_count, p.quote_count,
                a.username AS author_username,
                a.display_name AS author_display_name,
                a.verified AS author_verified
            FROM posts p
            LEFT JOIN authors a ON a.user_id = p.user_id
            "#,
        );
        query.push_where(&mut builder);
        builder.push(" ORDER BY p.created_at DESC, p.tweet_id DESC LIMIT ");
        builder.push_bind(query.limit());
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let rows = builder
            .build_query_as::<PostAuthorRow>()
            .fetch_all(&self.pool)
            .await?;

        let post_ids: Vec<String> = rows.iter().map(|row| row.post.tweet_id.clone()).collect();
        let mut tags_by_post = self.get_hashtags_for_posts(&post_ids).await?;

        let posts = rows
            .into_iter()
            .map(|row| {
                let author = row.author_verified.map(|verified| AuthorSummary {
                    username: row.author_username,
                    display_name: row.author_display_name,
                    verified,
                });
                let hashtags = tags_by_post.remove(&row.post.tweet_id).unwrap_or_default();

                PostWithRelations {
                    post: row.post,
                    author,
                    hashtags,
                }
            })
            .collect();

        Ok(posts)
    }

    // =========================================================================
    // Hashtags
    // =========================================================================

    /// Append a hashtag row. Duplicates are kept.
    pub async fn insert_hashtag(&self, post_id: &str, tag: &str) -> Result<(), AppError> {
        observe_db_query("insert", "hashtags");
        sqlx::query("INSERT INTO hashtags (post_id, tag) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All hashtag rows for a post in insertion order
    pub async fn get_hashtags(&self, post_id: &str) -> Result<Vec<Hashtag>, AppError> {
        observe_db_query("select", "hashtags");
        let hashtags =
            sqlx::query_as::<_, Hashtag>("SELECT * FROM hashtags WHERE post_id = ? ORDER BY id")
                .bind(post_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(hashtags)
    }

    /// Tags grouped by post id, each list in insertion order
    pub async fn get_hashtags_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, AppError> {
        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }

        observe_db_query("select", "hashtags");
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT post_id, tag FROM hashtags WHERE post_id IN (");
        {
            let mut separated = builder.separated(", ");
            for id in post_ids {
                separated.push_bind(id.clone());
            }
        }
        builder.push(") ORDER BY id");

        let rows = builder
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await?;

        for (post_id, tag) in rows {
            grouped.entry(post_id).or_default().push(tag);
        }

        Ok(grouped)
    }

    /// Whether any stored hashtag contains `needle` (case-insensitive)
    pub async fn hashtag_matches(&self, needle: &str) -> Result<bool, AppError> {
        observe_db_query("select", "hashtags");
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM hashtags WHERE tag LIKE ? ESCAPE '\')
            "#,
        )
        .bind(super::query::contains_pattern(needle))
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    // =========================================================================
    // Topic membership
    // =========================================================================

    /// Append a (topic, post) link. Duplicates are kept.
    pub async fn insert_topic_post(&self, topic_id: &str, post_id: &str) -> Result<(), AppError> {
        observe_db_query("insert", "topic_posts");
        sqlx::query("INSERT INTO topic_posts (topic_id, post_id) VALUES (?, ?)")
            .bind(topic_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Link rows of a topic in insertion order
    pub async fn get_topic_posts(&self, topic_id: &str) -> Result<Vec<TopicPost>, AppError> {
        observe_db_query("select", "topic_posts");
        let links = sqlx::query_as::<_, TopicPost>(
            "SELECT * FROM topic_posts WHERE topic_id = ? ORDER BY id",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    /// Link rows pointing at a post across all topics
    pub async fn count_post_links(&self, post_id: &str) -> Result<i64, AppError> {
        observe_db_query("count", "topic_posts");
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM topic_posts WHERE post_id = ?")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

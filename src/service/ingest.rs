//! Ingestion service
//!
//! Turns a JSON array of post-shaped objects into rows. One topic is created
//! per batch, then every element is written strictly in order: author upsert,
//! post upsert, hashtags, topic link. A failing element is logged and skipped;
//! there is no transaction around the batch.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::data::{Author, Database, Post, Topic};
use crate::error::AppError;
use crate::metrics::{INGEST_BATCHES_TOTAL, INGEST_DURATION_SECONDS, INGEST_POSTS_TOTAL};

/// Label used when the caller leaves the topic name blank
pub const DEFAULT_TOPIC_LABEL: &str = "Manual Import";

/// Language assigned to posts that do not carry one
pub const DEFAULT_LANG: &str = "en";

/// One element of an ingestion batch
///
/// Every field is optional. Identifiers may be JSON strings or numbers.
/// Counts and the verified flag treat falsy values (`null`, `false`, `0`,
/// `""`) as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tweet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub text: Option<String>,
    pub created_at: Option<String>,
    pub lang: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub like_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub retweet_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reply_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quote_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub followers_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub verified: Option<bool>,
    pub user_created_at: Option<String>,
    pub hashtags: Option<Vec<String>>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if is_falsy(&value) {
        return Ok(None);
    }

    let count = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    count
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected a count, got {value}")))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?
        .filter(|value| !is_falsy(value))
        .map(|_| true))
}

impl PostInput {
    /// Build the author and post rows, applying field defaults
    ///
    /// # Errors
    /// `AppError::Validation` when an identifier is missing or a timestamp
    /// cannot be parsed
    pub fn to_rows(&self, now: DateTime<Utc>) -> Result<(Author, Post), AppError> {
        let user_id = non_empty(&self.user_id)
            .ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
        let tweet_id = non_empty(&self.tweet_id)
            .ok_or_else(|| AppError::Validation("tweet_id is required".to_string()))?;

        let author = Author {
            user_id: user_id.to_string(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            created_at: parse_timestamp(non_empty(&self.user_created_at), now)?,
            followers_count: self.followers_count.unwrap_or(0),
            verified: self.verified.unwrap_or(false),
        };

        let post = Post {
            tweet_id: tweet_id.to_string(),
            user_id: user_id.to_string(),
            text: self.text.clone(),
            created_at: parse_timestamp(non_empty(&self.created_at), now)?,
            lang: non_empty(&self.lang).unwrap_or(DEFAULT_LANG).to_string(),
            like_count: self.like_count.unwrap_or(0),
            retweet_count: self.retweet_count.unwrap_or(0),
            reply_count: self.reply_count.unwrap_or(0),
            quote_count: self.quote_count.unwrap_or(0),
        };

        Ok((author, post))
    }

    /// Hashtags with one leading `#` removed
    pub fn normalized_hashtags(&self) -> Vec<String> {
        self.hashtags
            .iter()
            .flatten()
            .map(|tag| tag.strip_prefix('#').unwrap_or(tag).to_string())
            .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse RFC 3339, or a naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` read as UTC
fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let Some(raw) = raw else {
        return Ok(now);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::Validation(format!("invalid timestamp: {raw}")))
}

/// Result of an ingestion call
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub topic: Topic,
    /// Number of elements submitted (equals `topic.tweet_count`)
    pub tweet_count: usize,
    /// Elements whose author or post write failed
    pub skipped: usize,
}

/// Ingestion service
pub struct IngestService {
    db: Arc<Database>,
}

impl IngestService {
    /// Create new ingestion service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Ingest a JSON batch under a topic label
    ///
    /// # Arguments
    /// * `query_label` - Topic name; blank uses `DEFAULT_TOPIC_LABEL`
    /// * `raw_json` - JSON array of post objects
    ///
    /// # Errors
    /// Fails before any write when the payload is blank, not JSON, or not an
    /// array. Fails after validation only if the topic cannot be created.
    pub async fn ingest(&self, query_label: &str, raw_json: &str) -> Result<IngestReport, AppError> {
        let started = Instant::now();

        let elements = match parse_batch(raw_json) {
            Ok(elements) => elements,
            Err(error) => {
                INGEST_BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(error);
            }
        };

        let label = match query_label.trim() {
            "" => DEFAULT_TOPIC_LABEL,
            label => label,
        };

        let topic = match self.db.insert_topic(label, elements.len() as i64).await {
            Ok(topic) => topic,
            Err(error) => {
                INGEST_BATCHES_TOTAL.with_label_values(&["failed"]).inc();
                return Err(error);
            }
        };

        tracing::info!(
            topic_id = %topic.topic_id,
            query = %topic.query,
            tweet_count = topic.tweet_count,
            "Ingesting batch"
        );

        let tweet_count = elements.len();
        let mut skipped = 0usize;

        for (index, element) in elements.into_iter().enumerate() {
            match self.ingest_element(&topic, element).await {
                Ok(()) => {
                    INGEST_POSTS_TOTAL.with_label_values(&["stored"]).inc();
                }
                Err(error) => {
                    skipped += 1;
                    INGEST_POSTS_TOTAL.with_label_values(&["skipped"]).inc();
                    tracing::warn!(
                        topic_id = %topic.topic_id,
                        index,
                        %error,
                        "Skipping post"
                    );
                }
            }
        }

        INGEST_BATCHES_TOTAL.with_label_values(&["ok"]).inc();
        INGEST_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        tracing::info!(
            topic_id = %topic.topic_id,
            tweet_count,
            skipped,
            "Batch ingested"
        );

        Ok(IngestReport {
            topic,
            tweet_count,
            skipped,
        })
    }

    async fn ingest_element(&self, topic: &Topic, element: serde_json::Value) -> Result<(), AppError> {
        let input: PostInput = serde_json::from_value(element)
            .map_err(|e| AppError::Validation(format!("invalid post object: {e}")))?;
        let (author, post) = input.to_rows(Utc::now())?;

        tolerate_unique(self.db.upsert_author(&author).await)?;
        tolerate_unique(self.db.upsert_post(&post).await)?;

        for tag in input.normalized_hashtags() {
            if let Err(error) = self.db.insert_hashtag(&post.tweet_id, &tag).await {
                tracing::warn!(tweet_id = %post.tweet_id, %tag, %error, "Hashtag insert failed");
            }
        }

        if let Err(error) = self
            .db
            .insert_topic_post(&topic.topic_id, &post.tweet_id)
            .await
        {
            tracing::warn!(
                topic_id = %topic.topic_id,
                tweet_id = %post.tweet_id,
                %error,
                "Topic link insert failed"
            );
        }

        Ok(())
    }
}

/// Uniqueness violations on upsert are benign
fn tolerate_unique(result: Result<(), AppError>) -> Result<(), AppError> {
    match result {
        Err(error) if error.is_unique_violation() => {
            tracing::debug!(%error, "Ignoring uniqueness violation");
            Ok(())
        }
        other => other,
    }
}

/// Validate the raw payload and split it into elements
pub fn parse_batch(raw_json: &str) -> Result<Vec<serde_json::Value>, AppError> {
    if raw_json.trim().is_empty() {
        return Err(AppError::Validation(
            "No data provided. Please enter sample data in JSON format".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(raw_json)
        .map_err(|e| AppError::Validation(format!("Invalid JSON: {e}")))?;

    match value {
        serde_json::Value::Array(elements) => Ok(elements),
        _ => Err(AppError::Validation(
            "Data must be an array of tweets".to_string(),
        )),
    }
}

/// Demonstration batch of three posts one hour apart
///
/// Tweet ids are derived from `now` so repeated samples do not collide.
pub fn sample_batch(now: DateTime<Utc>) -> serde_json::Value {
    let stamp = now.timestamp_millis();
    let hour = chrono::Duration::hours(1);

    serde_json::json!([
        {
            "tweet_id": format!("{stamp}_1"),
            "user_id": "user_1",
            "username": "techguru",
            "display_name": "Tech Guru",
            "text": "Just deployed my new web app using Axum and SQLite! The developer experience is amazing. #webdev #rust #sqlite",
            "created_at": now.to_rfc3339(),
            "lang": "en",
            "like_count": 245,
            "retweet_count": 58,
            "reply_count": 32,
            "quote_count": 12,
            "followers_count": 15000,
            "verified": true,
            "hashtags": ["webdev", "rust", "sqlite"]
        },
        {
            "tweet_id": format!("{stamp}_2"),
            "user_id": "user_2",
            "username": "datascientist",
            "display_name": "Data Scientist",
            "text": "Machine learning models are getting more accurate every day. The future of AI is incredibly exciting! #AI #MachineLearning #DataScience",
            "created_at": (now - hour).to_rfc3339(),
            "lang": "en",
            "like_count": 512,
            "retweet_count": 123,
            "reply_count": 67,
            "quote_count": 45,
            "followers_count": 28000,
            "verified": true,
            "hashtags": ["AI", "MachineLearning", "DataScience"]
        },
        {
            "tweet_id": format!("{stamp}_3"),
            "user_id": "user_3",
            "username": "codewizard",
            "display_name": "Code Wizard",
            "text": "Strong typing catches so many bugs before runtime! #TypeScript #Rust #Types",
            "created_at": (now - hour * 2).to_rfc3339(),
            "lang": "en",
            "like_count": 189,
            "retweet_count": 42,
            "reply_count": 18,
            "quote_count": 8,
            "followers_count": 8500,
            "verified": false,
            "hashtags": ["TypeScript", "Rust", "Types"]
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_service() -> (IngestService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::connect(&temp_dir.path().join("test.db")).await.unwrap());
        (IngestService::new(db.clone()), db, temp_dir)
    }

    #[tokio::test]
    async fn ingests_single_post_example() {
        let (service, db, _temp_dir) = create_service().await;

        let raw = r#"[{"tweet_id":"t1","user_id":"u1","username":"a","text":"hello #x","hashtags":["x"]}]"#;
        let report = service.ingest("Demo", raw).await.unwrap();

        assert_eq!(report.tweet_count, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.topic.query, "Demo");
        assert_eq!(report.topic.tweet_count, 1);

        let author = db.get_author("u1").await.unwrap().unwrap();
        assert_eq!(author.username.as_deref(), Some("a"));
        assert_eq!(author.followers_count, 0);
        assert!(!author.verified);

        let post = db.get_post("t1").await.unwrap().unwrap();
        assert_eq!(post.lang, "en");
        assert_eq!(post.like_count, 0);
        assert_eq!(post.retweet_count, 0);
        assert_eq!(post.reply_count, 0);
        assert_eq!(post.quote_count, 0);

        let tags = db.get_hashtags("t1").await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag, "x");

        let links = db.get_topic_posts(&report.topic.topic_id).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].post_id, "t1");
    }

    #[tokio::test]
    async fn topic_count_is_input_length_even_when_posts_fail() {
        let (service, db, _temp_dir) = create_service().await;

        let raw = r#"[
            {"tweet_id":"t1","user_id":"u1","username":"ok"},
            {"tweet_id":"t2"},
            {"user_id":"u3"},
            42,
            {"tweet_id":"t5","user_id":"u5","created_at":"yesterday-ish"}
        ]"#;
        let report = service.ingest("Partial", raw).await.unwrap();

        assert_eq!(report.tweet_count, 5);
        assert_eq!(report.skipped, 4);

        let topic = db.get_topic(&report.topic.topic_id).await.unwrap().unwrap();
        assert_eq!(topic.tweet_count, 5);
        assert!(db.get_post("t1").await.unwrap().is_some());
        assert!(db.get_post("t2").await.unwrap().is_none());
        assert!(db.get_post("t5").await.unwrap().is_none());
        assert_eq!(db.get_topic_posts(&topic.topic_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_ingestion_updates_rows_and_duplicates_side_tables() {
        let (service, db, _temp_dir) = create_service().await;

        let first = r##"[{"tweet_id":"t1","user_id":"u1","username":"old","text":"v1","like_count":1,"hashtags":["#rust"]}]"##;
        let second = r##"[{"tweet_id":"t1","user_id":"u1","username":"new","text":"v2","like_count":9,"verified":true,"hashtags":["#rust"]}]"##;

        let first_report = service.ingest("One", first).await.unwrap();
        let second_report = service.ingest("Two", second).await.unwrap();

        let author = db.get_author("u1").await.unwrap().unwrap();
        assert_eq!(author.username.as_deref(), Some("new"));
        assert!(author.verified);

        let post = db.get_post("t1").await.unwrap().unwrap();
        assert_eq!(post.text.as_deref(), Some("v2"));
        assert_eq!(post.like_count, 9);

        let tags = db.get_hashtags("t1").await.unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|tag| tag.tag == "rust"));

        assert_eq!(db.count_post_links("t1").await.unwrap(), 2);
        assert_ne!(first_report.topic.topic_id, second_report.topic.topic_id);
    }

    #[tokio::test]
    async fn invalid_payloads_write_nothing() {
        let (service, db, _temp_dir) = create_service().await;

        for raw in ["", "   ", "not json", r#"{"tweet_id":"t1"}"#, "17"] {
            let error = service.ingest("Bad", raw).await.unwrap_err();
            assert!(matches!(error, AppError::Validation(_)), "{raw}");
        }

        assert_eq!(db.count_topics().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn blank_label_uses_default_and_empty_array_creates_topic() {
        let (service, _db, _temp_dir) = create_service().await;

        let report = service.ingest("  ", "[]").await.unwrap();
        assert_eq!(report.topic.query, DEFAULT_TOPIC_LABEL);
        assert_eq!(report.tweet_count, 0);
    }

    #[tokio::test]
    async fn sample_batch_ingests_cleanly() {
        let (service, db, _temp_dir) = create_service().await;

        let sample = serde_json::to_string_pretty(&sample_batch(Utc::now())).unwrap();
        let report = service.ingest("Sample", &sample).await.unwrap();

        assert_eq!(report.tweet_count, 3);
        assert_eq!(report.skipped, 0);
        let author = db.get_author("user_2").await.unwrap().unwrap();
        assert_eq!(author.followers_count, 28000);
        assert!(author.verified);
    }

    #[test]
    fn to_rows_applies_defaults() {
        let now = Utc::now();
        let input = PostInput {
            tweet_id: Some("t1".to_string()),
            user_id: Some("u1".to_string()),
            lang: Some(String::new()),
            user_created_at: Some(String::new()),
            ..PostInput::default()
        };

        let (author, post) = input.to_rows(now).unwrap();
        assert_eq!(author.created_at, now);
        assert_eq!(author.followers_count, 0);
        assert!(!author.verified);
        assert_eq!(post.created_at, now);
        assert_eq!(post.lang, "en");
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let input: PostInput =
            serde_json::from_str(r#"{"tweet_id": 1234567890, "user_id": 42}"#).unwrap();
        assert_eq!(input.tweet_id.as_deref(), Some("1234567890"));
        assert_eq!(input.user_id.as_deref(), Some("42"));
    }

    #[test]
    fn falsy_counts_and_flag_fall_back_to_defaults() {
        let input: PostInput = serde_json::from_str(
            r#"{"tweet_id":"t1","user_id":"u1","like_count":"","retweet_count":false,"reply_count":null,"quote_count":0,"followers_count":false,"verified":0}"#,
        )
        .unwrap();

        let (author, post) = input.to_rows(Utc::now()).unwrap();
        assert_eq!(post.like_count, 0);
        assert_eq!(post.retweet_count, 0);
        assert_eq!(post.reply_count, 0);
        assert_eq!(post.quote_count, 0);
        assert_eq!(author.followers_count, 0);
        assert!(!author.verified);
    }

    #[test]
    fn truthy_counts_and_flag_are_coerced() {
        let input: PostInput = serde_json::from_str(
            r#"{"like_count":"12","retweet_count":3.0,"verified":1}"#,
        )
        .unwrap();
        assert_eq!(input.like_count, Some(12));
        assert_eq!(input.retweet_count, Some(3));
        assert_eq!(input.verified, Some(true));

        assert!(serde_json::from_str::<PostInput>(r#"{"like_count":"many"}"#).is_err());
    }

    #[tokio::test]
    async fn falsy_fields_do_not_skip_the_post() {
        let (service, db, _temp_dir) = create_service().await;

        let raw = r#"[{"tweet_id":"t1","user_id":"u1","like_count":"","verified":0,"followers_count":false}]"#;
        let report = service.ingest("Falsy", raw).await.unwrap();

        assert_eq!(report.skipped, 0);
        let post = db.get_post("t1").await.unwrap().unwrap();
        assert_eq!(post.like_count, 0);
        let author = db.get_author("u1").await.unwrap().unwrap();
        assert!(!author.verified);
        assert_eq!(author.followers_count, 0);
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive_forms() {
        let now = Utc::now();
        let zulu = parse_timestamp(Some("2024-01-15T10:00:00Z"), now).unwrap();
        let offset = parse_timestamp(Some("2024-01-15T12:00:00+02:00"), now).unwrap();
        let naive = parse_timestamp(Some("2024-01-15 10:00:00"), now).unwrap();
        assert_eq!(zulu, offset);
        assert_eq!(zulu, naive);
        assert!(parse_timestamp(Some("15/01/2024"), now).is_err());
    }

    #[test]
    fn hashtags_lose_one_leading_hash() {
        let input = PostInput {
            hashtags: Some(vec!["#rust".to_string(), "go".to_string(), "##x".to_string()]),
            ..PostInput::default()
        };
        assert_eq!(input.normalized_hashtags(), vec!["rust", "go", "#x"]);
    }
}

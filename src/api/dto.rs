//! JSON API request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::data::clamp_page;
use crate::service::{IngestReport, IssuedSession, SearchFilters};

/// Body of sign-up and sign-in requests
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

impl From<&Session> for UserResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.user_id.clone(),
            email: session.email.clone(),
        }
    }
}

/// Returned by sign-up and sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Bearer token; the same value is also set as the session cookie
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&IssuedSession> for AuthResponse {
    fn from(issued: &IssuedSession) -> Self {
        Self {
            user: UserResponse::from(&issued.session),
            token: issued.token.clone(),
            expires_at: issued.session.expires_at,
        }
    }
}

/// Current session, `user: null` when anonymous
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<UserResponse>,
}

/// Body of `POST /api/v1/ingest`
///
/// `data` is either the raw JSON text of the batch or the batch itself.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl IngestRequest {
    /// Batch as raw JSON text
    pub fn raw_data(&self) -> String {
        match &self.data {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub topic_id: String,
    pub query: String,
    pub tweet_count: usize,
    pub skipped: usize,
}

impl From<IngestReport> for IngestResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            success: true,
            message: ingest_success_message(report.tweet_count),
            topic_id: report.topic.topic_id,
            query: report.topic.query,
            tweet_count: report.tweet_count,
            skipped: report.skipped,
        }
    }
}

/// User-facing confirmation for a finished batch
pub fn ingest_success_message(tweet_count: usize) -> String {
    format!("Successfully ingested {tweet_count} tweets")
}

/// Pretty-printed demonstration batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleResponse {
    pub data: String,
}

/// Query string of post searches
///
/// Field names are camelCase to match the dashboard form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub text_contains: Option<String>,
    pub hashtag: Option<String>,
    pub username: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub language: Option<String>,
    pub page: Option<i64>,
}

impl SearchParams {
    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            text_contains: self.text_contains.clone(),
            hashtag: self.hashtag.clone(),
            username: self.username.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            language: self.language.clone(),
        }
    }

    /// Requested page, clamped to `1..=MAX_PAGE`
    pub fn page(&self) -> i64 {
        clamp_page(self.page.unwrap_or(1))
    }

    /// Query string for the same filters on another page
    pub fn query_string_for_page(&self, page: i64) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        let fields = [
            ("textContains", &self.text_contains),
            ("hashtag", &self.hashtag),
            ("username", &self.username),
            ("dateFrom", &self.date_from),
            ("dateTo", &self.date_to),
            ("language", &self.language),
        ];
        for (name, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                serializer.append_pair(name, value);
            }
        }
        serializer.append_pair("page", &page.to_string());
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MAX_PAGE;

    #[test]
    fn ingest_request_accepts_text_or_array() {
        let text: IngestRequest =
            serde_json::from_str(r#"{"query":"q","data":"[{\"tweet_id\":\"t1\"}]"}"#).unwrap();
        assert_eq!(text.raw_data(), r#"[{"tweet_id":"t1"}]"#);

        let array: IngestRequest =
            serde_json::from_str(r#"{"query":"q","data":[{"tweet_id":"t1"}]}"#).unwrap();
        assert_eq!(array.raw_data(), r#"[{"tweet_id":"t1"}]"#);

        let missing: IngestRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(missing.raw_data(), "");
        assert_eq!(missing.query, "");
    }

    #[test]
    fn pager_query_string_keeps_filters() {
        let params = SearchParams {
            hashtag: Some("rust lang".to_string()),
            language: Some(String::new()),
            page: Some(1),
            ..SearchParams::default()
        };
        assert_eq!(params.query_string_for_page(2), "hashtag=rust+lang&page=2");
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(SearchParams::default().page(), 1);
        let params = SearchParams {
            page: Some(-3),
            ..SearchParams::default()
        };
        assert_eq!(params.page(), 1);

        let params = SearchParams {
            page: Some(i64::MAX),
            ..SearchParams::default()
        };
        assert_eq!(params.page(), MAX_PAGE);
    }
}

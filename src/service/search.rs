//! Search service
//!
//! Compiles dashboard filters into a `PostQuery`. Username and hashtag
//! filters are resolved to id lists first; when either resolves to nothing
//! the search ends without touching the posts table.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Database, PostPredicate, PostQuery, PostWithRelations, clamp_page};
use crate::error::AppError;
use crate::metrics::SEARCHES_TOTAL;

/// Optional dashboard filters; empty strings count as absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub text_contains: Option<String>,
    pub hashtag: Option<String>,
    pub username: Option<String>,
    /// `YYYY-MM-DD`, inclusive from 00:00:00.000 UTC
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`, inclusive through 23:59:59.999 UTC
    pub date_to: Option<String>,
    pub language: Option<String>,
}

impl SearchFilters {
    fn text(&self) -> Option<&str> {
        present(&self.text_contains)
    }

    fn username(&self) -> Option<&str> {
        present(&self.username)
    }

    fn hashtag(&self) -> Option<&str> {
        present(&self.hashtag)
            .map(|tag| tag.strip_prefix('#').unwrap_or(tag))
            .filter(|tag| !tag.is_empty())
    }

    fn language(&self) -> Option<&str> {
        present(&self.language)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a `YYYY-MM-DD` bound
fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{field} must be a date in YYYY-MM-DD format")))
}

/// Start of `date` in UTC
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable millisecond of `date` in UTC
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub posts: Vec<PostWithRelations>,
    pub page: i64,
    pub total: i64,
    pub has_more: bool,
}

impl SearchPage {
    fn empty(page: i64) -> Self {
        Self {
            posts: Vec::new(),
            page,
            total: 0,
            has_more: false,
        }
    }
}

/// Search service
pub struct SearchService {
    db: Arc<Database>,
}

impl SearchService {
    /// Create new search service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Build the post query for `filters`
    ///
    /// Predicates are added in a fixed order: text, username, hashtag,
    /// lower date, upper date, language.
    ///
    /// # Returns
    /// `None` when a username or hashtag filter matched nothing
    ///
    /// # Errors
    /// `Validation` for a malformed date, before any lookup runs
    pub async fn plan(&self, filters: &SearchFilters, page: i64) -> Result<Option<PostQuery>, AppError> {
        let date_from = present(&filters.date_from)
            .map(|raw| parse_date("dateFrom", raw))
            .transpose()?;
        let date_to = present(&filters.date_to)
            .map(|raw| parse_date("dateTo", raw))
            .transpose()?;

        let mut query = PostQuery::new().on_page(page);

        if let Some(text) = filters.text() {
            query = query.with(PostPredicate::TextContains(text.to_string()));
        }

        if let Some(username) = filters.username() {
            if !self.db.author_username_matches(username).await? {
                tracing::debug!(%username, "No authors match username filter");
                return Ok(None);
            }
            query = query.with(PostPredicate::AuthorUsernameContains(username.to_string()));
        }

        if let Some(hashtag) = filters.hashtag() {
            if !self.db.hashtag_matches(hashtag).await? {
                tracing::debug!(%hashtag, "No posts match hashtag filter");
                return Ok(None);
            }
            query = query.with(PostPredicate::HashtagContains(hashtag.to_string()));
        }

        if let Some(date) = date_from {
            query = query.with(PostPredicate::CreatedFrom(start_of_day(date)));
        }

        if let Some(date) = date_to {
            query = query.with(PostPredicate::CreatedTo(end_of_day(date)));
        }

        if let Some(language) = filters.language() {
            query = query.with(PostPredicate::LangEquals(language.to_string()));
        }

        Ok(Some(query))
    }

    /// Run a search and return one page of posts, newest first
    pub async fn search(&self, filters: &SearchFilters, page: i64) -> Result<SearchPage, AppError> {
        let result = self.run(filters, page).await;

        let outcome = match &result {
            Ok(Some(_)) => "ok",
            Ok(None) => "short_circuit",
            Err(_) => "error",
        };
        SEARCHES_TOTAL.with_label_values(&[outcome]).inc();

        match result? {
            Some(page) => Ok(page),
            None => Ok(SearchPage::empty(clamp_page(page))),
        }
    }

    async fn run(&self, filters: &SearchFilters, page: i64) -> Result<Option<SearchPage>, AppError> {
        let Some(query) = self.plan(filters, page).await? else {
            return Ok(None);
        };

        let total = self.db.count_posts(&query).await?;
        let posts = self.db.fetch_post_page(&query).await?;

        tracing::debug!(total, page = query.page(), returned = posts.len(), "Search complete");

        Ok(Some(SearchPage {
            posts,
            page: query.page(),
            total,
            has_more: query.has_more(total),
        }))
    }
}

//! Post query descriptor
//!
//! A `PostQuery` is an immutable list of predicates plus a page number.
//! Each `with` step returns a new descriptor; the database layer renders
//! the predicates in the order they were appended.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// Fixed number of posts per result page
pub const PAGE_SIZE: i64 = 20;

/// Highest selectable page; larger requests are clamped so offsets stay in range
pub const MAX_PAGE: i64 = i64::MAX / PAGE_SIZE;

/// A single restriction on the posts table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostPredicate {
    /// Case-insensitive containment on post text
    TextContains(String),
    /// Author username contains the needle, case-insensitive
    AuthorUsernameContains(String),
    /// Some hashtag of the post contains the needle, case-insensitive
    HashtagContains(String),
    /// created_at >= bound
    CreatedFrom(DateTime<Utc>),
    /// created_at <= bound
    CreatedTo(DateTime<Utc>),
    /// Exact language code
    LangEquals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    predicates: Vec<PostPredicate>,
    page: i64,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PostQuery {
    /// Unfiltered query for the first page
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
            page: 1,
        }
    }

    /// Append a predicate
    pub fn with(mut self, predicate: PostPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Select a 1-based page, clamped to `1..=MAX_PAGE`
    pub fn on_page(mut self, page: i64) -> Self {
        self.page = clamp_page(page);
        self
    }

    pub fn predicates(&self) -> &[PostPredicate] {
        &self.predicates
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    /// Whether more rows exist after this page given the total match count
    pub fn has_more(&self, total: i64) -> bool {
        has_more(total, self.page)
    }

    /// Render the WHERE clause against the `p` alias of the posts table
    pub(crate) fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (index, predicate) in self.predicates.iter().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });

            match predicate {
                PostPredicate::TextContains(needle) => {
                    builder.push("p.text LIKE ");
                    builder.push_bind(contains_pattern(needle));
                    builder.push(" ESCAPE '\\'");
                }
                PostPredicate::AuthorUsernameContains(needle) => {
                    builder.push("p.user_id IN (SELECT user_id FROM authors WHERE username LIKE ");
                    builder.push_bind(contains_pattern(needle));
                    builder.push(" ESCAPE '\\')");
                }
                PostPredicate::HashtagContains(needle) => {
                    builder.push("p.tweet_id IN (SELECT post_id FROM hashtags WHERE tag LIKE ");
                    builder.push_bind(contains_pattern(needle));
                    builder.push(" ESCAPE '\\')");
                }
                PostPredicate::CreatedFrom(bound) => {
                    builder.push("p.created_at >= ");
                    builder.push_bind(*bound);
                }
                PostPredicate::CreatedTo(bound) => {
                    builder.push("p.created_at <= ");
                    builder.push_bind(*bound);
                }
                PostPredicate::LangEquals(lang) => {
                    builder.push("p.lang = ");
                    builder.push_bind(lang.clone());
                }
            }
        }
    }
}

/// Clamp a requested page into `1..=MAX_PAGE`
pub fn clamp_page(page: i64) -> i64 {
    page.clamp(1, MAX_PAGE)
}

/// `has_more = total > page * PAGE_SIZE`
pub fn has_more(total: i64, page: i64) -> bool {
    total > clamp_page(page).saturating_mul(PAGE_SIZE)
}

/// LIKE pattern matching `needle` anywhere, with wildcards escaped by `\`
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

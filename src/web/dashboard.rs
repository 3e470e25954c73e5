//! Dashboard page: filter form, results table and pager

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use super::layout::{NavItem, Notice, attr, render_page, text};
use crate::AppState;
use crate::api::SearchParams;
use crate::auth::MaybeUser;
use crate::data::PostWithRelations;
use crate::service::SearchPage;

/// Language codes offered by the filter form
pub const LANGUAGES: [(&str, &str); 12] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("ru", "Russian"),
];

const VISIBLE_HASHTAGS: usize = 3;

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(session) = session else {
        return Redirect::to("/login").into_response();
    };

    let (results, notice) = match state.search.search(&params.filters(), params.page()).await {
        Ok(results) => (results, None),
        Err(error) => {
            tracing::error!(%error, "Dashboard search failed");
            let empty = SearchPage {
                posts: Vec::new(),
                page: params.page(),
                total: 0,
                has_more: false,
            };
            (
                empty,
                Some(Notice::Error(format!("Search failed: {}", error.user_message()))),
            )
        }
    };

    let body = format!(
        "<h1>Dashboard</h1>\n{}\n{}\n{}\n{}",
        notice.map(|n| n.render()).unwrap_or_default(),
        render_filter_form(&params),
        render_results(&results),
        render_pager(&params, &results)
    );

    Html(render_page("Dashboard", Some(&session), NavItem::Dashboard, &body)).into_response()
}

fn render_filter_form(params: &SearchParams) -> String {
    let value = |field: &Option<String>| attr(field.as_deref().unwrap_or(""));
    let selected_language = params.language.as_deref().unwrap_or("");

    let mut options = String::from(r#"<option value="">All languages</option>"#);
    for (code, name) in LANGUAGES {
        let selected = if code == selected_language { " selected" } else { "" };
        options.push_str(&format!(r#"<option value="{code}"{selected}>{name}</option>"#));
    }

    format!(
        r##"<form class="filters" method="get" action="/dashboard">
  <label>Text <input type="text" name="textContains" value="{}" placeholder="Search text" /></label>
  <label>Hashtag <input type="text" name="hashtag" value="{}" placeholder="#hashtag" /></label>
  <label>Username <input type="text" name="username" value="{}" placeholder="username" /></label>
  <label>From <input type="date" name="dateFrom" value="{}" /></label>
  <label>To <input type="date" name="dateTo" value="{}" /></label>
  <label>Language <select name="language">{}</select></label>
  <div><button type="submit">Search</button> <a href="/dashboard">Clear</a></div>
</form>"##,
        value(&params.text_contains),
        value(&params.hashtag),
        value(&params.username),
        value(&params.date_from),
        value(&params.date_to),
        options
    )
}

fn render_results(results: &SearchPage) -> String {
    let summary = format!(
        r#"<p class="muted">{} posts found, page {}</p>"#,
        results.total, results.page
    );

    if results.posts.is_empty() {
        return format!(
            "{summary}\n<table><tbody><tr><td>No posts found. Try adjusting your filters or ingest some data.</td></tr></tbody></table>"
        );
    }

    let rows: String = results.posts.iter().map(render_row).collect();
    format!(
        r#"{summary}
<table>
<thead><tr><th>Author</th><th>Post</th><th>Hashtags</th><th>Date</th><th>Lang</th><th>Engagement</th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#
    )
}

fn render_row(item: &PostWithRelations) -> String {
    let post = &item.post;

    let author = match &item.author {
        Some(author) => {
            let name = author
                .display_name
                .as_deref()
                .or(author.username.as_deref())
                .unwrap_or("Unknown");
            let badge = if author.verified {
                r#" <span class="verified" title="Verified">✓</span>"#
            } else {
                ""
            };
            let handle = author
                .username
                .as_deref()
                .map(|u| format!(r#"<div class="muted">@{}</div>"#, text(u)))
                .unwrap_or_default();
            format!("<strong>{}</strong>{badge}{handle}", text(name))
        }
        None => r#"<span class="muted">Unknown</span>"#.to_string(),
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}<div class=\"muted\">{}</div></td><td>{}</td><td>♥ {} · ⟳ {} · 💬 {}</td></tr>\n",
        author,
        text(post.text.as_deref().unwrap_or("")),
        render_hashtags(&item.hashtags),
        post.created_at.format("%Y-%m-%d"),
        post.created_at.format("%H:%M"),
        text(&post.lang.to_uppercase()),
        post.like_count,
        post.retweet_count,
        post.reply_count
    )
}

/// First three tags as badges, then a `+N` badge for the rest
fn render_hashtags(tags: &[String]) -> String {
    let mut html: String = tags
        .iter()
        .take(VISIBLE_HASHTAGS)
        .map(|tag| format!(r#"<span class="badge">#{}</span>"#, text(tag)))
        .collect();

    if tags.len() > VISIBLE_HASHTAGS {
        html.push_str(&format!(
            r#"<span class="badge">+{}</span>"#,
            tags.len() - VISIBLE_HASHTAGS
        ));
    }

    html
}

fn render_pager(params: &SearchParams, results: &SearchPage) -> String {
    let previous = if results.page > 1 {
        format!(
            r#"<a href="/dashboard?{}">Previous</a>"#,
            attr(&params.query_string_for_page(results.page - 1))
        )
    } else {
        "<span></span>".to_string()
    };

    let next = if results.has_more {
        format!(
            r#"<a href="/dashboard?{}">Next</a>"#,
            attr(&params.query_string_for_page(results.page.saturating_add(1)))
        )
    } else {
        "<span></span>".to_string()
    };

    format!(r#"<div class="pager">{previous}{next}</div>"#)
}

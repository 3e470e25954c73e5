//! Admin page: manual ingestion form and recent topics

use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::layout::{NavItem, Notice, attr, render_page, text};
use crate::AppState;
use crate::api::ingest_success_message;
use crate::auth::{MaybeUser, Session};
use crate::data::Topic;
use crate::service::sample_batch;

/// Number of topics listed on the admin page
pub const RECENT_TOPICS_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    /// Prefill the form with a generated sample batch
    #[serde(default)]
    pub sample: bool,
}

#[derive(Debug, Deserialize)]
pub struct IngestForm {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub data: String,
}

/// GET /admin
pub async fn admin_page(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Query(query): Query<AdminQuery>,
) -> Response {
    let Some(session) = session else {
        return Redirect::to("/login").into_response();
    };

    let (label, data) = if query.sample {
        let sample = serde_json::to_string_pretty(&sample_batch(Utc::now())).unwrap_or_default();
        ("Sample Data".to_string(), sample)
    } else {
        (String::new(), String::new())
    };

    render(&state, &session, None, &label, &data).await
}

/// POST /admin/ingest
pub async fn admin_ingest(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Form(form): Form<IngestForm>,
) -> Response {
    let Some(session) = session else {
        return Redirect::to("/login").into_response();
    };

    match state.ingest.ingest(&form.query, &form.data).await {
        Ok(report) => {
            let notice = Notice::Success(ingest_success_message(report.tweet_count));
            render(&state, &session, Some(notice), "", "").await
        }
        Err(error) => {
            tracing::warn!(%error, "Ingestion from admin page failed");
            let notice = Notice::Error(error.user_message());
            render(&state, &session, Some(notice), &form.query, &form.data).await
        }
    }
}

async fn render(
    state: &AppState,
    session: &Session,
    notice: Option<Notice>,
    label: &str,
    data: &str,
) -> Response {
    let topics = match state.db.get_recent_topics(RECENT_TOPICS_LIMIT).await {
        Ok(topics) => render_topics(&topics),
        Err(error) => {
            tracing::error!(%error, "Failed to load recent topics");
            Notice::Error("Failed to load recent topics".to_string()).render()
        }
    };

    let body = format!(
        r#"<h1>Admin</h1>
{}
<section>
<h2>Ingest Tweets</h2>
<form method="post" action="/admin/ingest">
  <p><label>Query label <input type="text" name="query" value="{}" placeholder="Manual Import" /></label></p>
  <p><label>Tweet data (JSON array)<br /><textarea name="data" rows="16">{}</textarea></label></p>
  <p><button type="submit">Ingest Data</button> <a href="/admin?sample=true">Generate Sample</a></p>
</form>
</section>
<section>
<h2>Recent Topics</h2>
{}
</section>"#,
        notice.map(|n| n.render()).unwrap_or_default(),
        attr(label),
        text(data),
        topics
    );

    Html(render_page("Admin", Some(session), NavItem::Admin, &body)).into_response()
}

fn render_topics(topics: &[Topic]) -> String {
    if topics.is_empty() {
        return r#"<p class="muted">No topics yet.</p>"#.to_string();
    }

    let rows: String = topics
        .iter()
        .map(|topic| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                text(&topic.query),
                topic.run_at.format("%Y-%m-%d %H:%M:%S"),
                topic.tweet_count
            )
        })
        .collect();

    format!(
        "<table>\n<thead><tr><th>Query</th><th>Run at</th><th>Tweets</th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_table_escapes_labels() {
        let topics = vec![Topic {
            topic_id: "01".to_string(),
            query: "<b>bold</b>".to_string(),
            run_at: Utc::now(),
            tweet_count: 7,
        }];
        let html = render_topics(&topics);
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains("<td>7</td>"));
    }

    #[test]
    fn empty_topics_render_placeholder() {
        assert!(render_topics(&[]).contains("No topics yet"));
    }
}

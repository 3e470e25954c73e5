//! Page shell shared by all server-rendered pages

use crate::auth::Session;

/// Which navbar entry is highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Dashboard,
    Admin,
    None,
}

/// Banner shown above page content
#[derive(Debug, Clone)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn render(&self) -> String {
        let (class, message) = match self {
            Notice::Success(message) => ("notice success", message),
            Notice::Error(message) => ("notice error", message),
        };
        format!(
            r#"<div class="{}" role="status">{}</div>"#,
            class,
            html_escape::encode_text(message)
        )
    }
}

const STYLE: &str = r#"
  body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #1f2328; }
  nav { display: flex; align-items: center; gap: 1rem; padding: 0.75rem 1.5rem; background: #fff; border-bottom: 1px solid #d0d7de; }
  nav .brand { font-weight: 700; margin-right: auto; }
  nav a { color: #1f2328; text-decoration: none; }
  nav a.active { font-weight: 600; text-decoration: underline; }
  nav form { margin: 0; }
  main { max-width: 72rem; margin: 1.5rem auto; padding: 0 1.5rem; }
  table { width: 100%; border-collapse: collapse; background: #fff; }
  th, td { text-align: left; padding: 0.5rem; border-bottom: 1px solid #d0d7de; vertical-align: top; }
  .notice { padding: 0.75rem 1rem; margin-bottom: 1rem; border-radius: 6px; }
  .notice.success { background: #dafbe1; }
  .notice.error { background: #ffebe9; }
  .badge { display: inline-block; padding: 0 0.4rem; margin: 0 0.15rem 0.15rem 0; border-radius: 999px; background: #ddf4ff; font-size: 0.8rem; }
  .verified { color: #0969da; }
  .muted { color: #656d76; font-size: 0.85rem; }
  .pager { display: flex; justify-content: space-between; margin-top: 1rem; }
  form.filters { display: grid; grid-template-columns: repeat(3, 1fr); gap: 0.75rem; margin-bottom: 1rem; }
  textarea { width: 100%; font-family: ui-monospace, monospace; }
"#;

/// Render a complete HTML document
pub fn render_page(title: &str, session: Option<&Session>, active: NavItem, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{} - TweetQuery</title>
  <style>{}</style>
</head>
<body>
{}
<main>
{}
</main>
</body>
</html>"#,
        html_escape::encode_text(title),
        STYLE,
        render_navbar(session, active),
        body
    )
}

fn render_navbar(session: Option<&Session>, active: NavItem) -> String {
    let Some(session) = session else {
        return r#"<nav><span class="brand">TweetQuery</span><a href="/login">Sign in</a><a href="/signup">Sign up</a></nav>"#
            .to_string();
    };

    let link = |href: &str, label: &str, item: NavItem| {
        let class = if item == active { r#" class="active""# } else { "" };
        format!(r#"<a href="{href}"{class}>{label}</a>"#)
    };

    format!(
        r#"<nav><span class="brand">TweetQuery</span>{}{}<span class="muted">{}</span><form method="post" action="/logout"><button type="submit">Logout</button></form></nav>"#,
        link("/dashboard", "Dashboard", NavItem::Dashboard),
        link("/admin", "Admin", NavItem::Admin),
        html_escape::encode_text(&session.email)
    )
}

/// Escape text for an HTML body position
pub fn text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

/// Escape text for a double-quoted attribute
pub fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(email: &str) -> Session {
        Session {
            user_id: "u".to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn navbar_shows_email_escaped() {
        let html = render_page("Dashboard", Some(&session("<b>@x.y")), NavItem::Dashboard, "");
        assert!(html.contains("&lt;b&gt;@x.y"));
        assert!(html.contains(r#"<a href="/dashboard" class="active">"#));
        assert!(html.contains(r#"action="/logout""#));
    }

    #[test]
    fn anonymous_navbar_links_to_login() {
        let html = render_page("Login", None, NavItem::None, "");
        assert!(html.contains(r#"href="/login""#));
        assert!(!html.contains("Logout"));
    }

    #[test]
    fn notice_escapes_message() {
        let html = Notice::Error("<script>".to_string()).render();
        assert!(html.contains("&lt;script&gt;"));
    }
}

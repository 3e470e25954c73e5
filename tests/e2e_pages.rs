//! E2E tests for server-rendered pages

mod common;

use common::TestServer;
use serde_json::json;

fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_anonymous_visitors_are_redirected_to_login() {
    let server = TestServer::new().await;

    for path in ["/", "/dashboard", "/admin"] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert!(response.status().is_redirection(), "{path}");
        assert_eq!(location(&response), Some("/login"), "{path}");
    }
}

#[tokio::test]
async fn test_root_redirects_signed_in_user_to_dashboard() {
    let server = TestServer::new().await;
    let token = server.sign_up_test_user().await;

    let response = server
        .client
        .get(server.url("/"))
        .header("cookie", TestServer::session_cookie(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), Some("/dashboard"));
}

#[tokio::test]
async fn test_dashboard_renders_results_escaped() {
    let server = TestServer::new().await;
    let token = server.sign_up_test_user().await;

    server
        .ingest(
            &token,
            "Demo",
            json!([{
                "tweet_id": "t1",
                "user_id": "u1",
                "username": "guru",
                "display_name": "Guru",
                "verified": true,
                "text": "<script>alert(1)</script>",
                "lang": "ja",
                "hashtags": ["a", "b", "c", "d", "e"]
            }]),
        )
        .await;

    let response = server
        .client
        .get(server.url("/dashboard?username=guru"))
        .header("cookie", TestServer::session_cookie(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!body.contains("<script>alert(1)</script>"));
    assert!(body.contains("@guru"));
    assert!(body.contains("+2"));
    assert!(body.contains("<td>JA</td>"));
    assert!(body.contains("reader@example.com"));
}

#[tokio::test]
async fn test_dashboard_reports_bad_filters() {
    let server = TestServer::new().await;
    let token = server.sign_up_test_user().await;

    let response = server
        .client
        .get(server.url("/dashboard?dateFrom=yesterday"))
        .header("cookie", TestServer::session_cookie(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Search failed"));
    assert!(body.contains("No posts found"));
}

#[tokio::test]
async fn test_admin_form_ingests_and_lists_topic() {
    let server = TestServer::new().await;
    let token = server.sign_up_test_user().await;
    let cookie = TestServer::session_cookie(&token);

    let response = server
        .client
        .post(server.url("/admin/ingest"))
        .header("cookie", &cookie)
        .form(&[
            ("query", "Form Import"),
            ("data", r#"[{"tweet_id":"f1","user_id":"u1"}]"#),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Successfully ingested 1 tweets"));
    assert!(body.contains("<td>Form Import</td>"));

    let bad = server
        .client
        .post(server.url("/admin/ingest"))
        .header("cookie", &cookie)
        .form(&[("query", "Broken"), ("data", "")])
        .send()
        .await
        .unwrap();
    let body = bad.text().await.unwrap();
    assert!(body.contains("No data provided"));
}

#[tokio::test]
async fn test_admin_sample_prefills_form() {
    let server = TestServer::new().await;
    let token = server.sign_up_test_user().await;

    let body = server
        .client
        .get(server.url("/admin?sample=true"))
        .header("cookie", TestServer::session_cookie(&token))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("Sample Data"));
    assert!(body.contains("techguru"));
}

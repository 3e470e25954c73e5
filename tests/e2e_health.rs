//! E2E tests for health check and basic server functionality

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_require_auth() {
    let server = TestServer::new().await;

    let anonymous = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);

    let token = server.sign_up_test_user().await;
    let response = server
        .client
        .get(server.url("/metrics"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("tweetquery_db_queries_total"));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = TestServer::with_config(|config| config.ingest.max_body_bytes = 1024).await;
    let token = server.sign_up_test_user().await;

    let response = server
        .client
        .post(server.url("/api/v1/ingest"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body(format!(r#"{{"query":"big","data":"{}"}}"#, "x".repeat(4096)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
}

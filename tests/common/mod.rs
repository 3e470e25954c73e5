//! Common test utilities for E2E tests

#![allow(dead_code)]

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tweetquery::{AppState, config};

pub const TEST_EMAIL: &str = "reader@example.com";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                allow_signup: true,
                password_hash_rounds: 1_000,
            },
            ingest: config::IngestConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        adjust(&mut config);

        tweetquery::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client; redirects are asserted explicitly
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = tweetquery::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register the default test user and return its bearer token
    pub async fn sign_up_test_user(&self) -> String {
        let response = self
            .client
            .post(self.url("/api/v1/auth/sign_up"))
            .json(&json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Cookie header value carrying `token`
    pub fn session_cookie(token: &str) -> String {
        format!("session={token}")
    }

    /// Ingest a batch through the API and return the response body
    pub async fn ingest(&self, token: &str, query: &str, data: Value) -> Value {
        let response = self
            .client
            .post(self.url("/api/v1/ingest"))
            .bearer_auth(token)
            .json(&json!({ "query": query, "data": data }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    /// Search posts through the API
    pub async fn search(&self, token: &str, query: &[(&str, &str)]) -> Value {
        let response = self
            .client
            .get(self.url("/api/v1/posts"))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

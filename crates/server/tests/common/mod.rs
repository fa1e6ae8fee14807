//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock ad server injected, enabling end-to-end API testing
//! without a real site or GAM network.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use adprovision_core::{
    testing::MockAdServer, AdServerAdapter, BidderRegistry, Config, DatabaseConfig, ProductStore,
    ServerConfig, SettingsStore, SqliteProductStore, SqliteSettingsStore, WorkflowConfig,
};
use adprovision_server::{api::create_router, state::AppState, wizard::WizardSession};

/// Re-export fixtures for test convenience
pub use adprovision_core::testing::fixtures;

/// Test fixture for API testing with a mock ad server.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_run() {
///     let fixture = TestFixture::new().await;
///     fixture.server.set_lica_len(250).await;
///
///     let response = fixture.post("/api/v1/wizard/run", json!({})).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock ad server - configure orders, failures and bidders
    pub server: MockAdServer,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with provisioning enabled and two bidders.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let server = MockAdServer::new();
        server
            .set_bidders(vec![
                fixtures::bidder("medianet", "Media.net"),
                fixtures::bidder("openx", "OpenX"),
            ])
            .await;

        let workflow_config = WorkflowConfig {
            batch_size: test_config.batch_size,
            ..Default::default()
        };

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            workflow: workflow_config.clone(),
            ..Config::default()
        };

        let registry = Arc::new(
            BidderRegistry::load(&config.bidders, &server)
                .await
                .expect("Failed to load bidders"),
        );

        let product_store: Arc<dyn ProductStore> = Arc::new(
            SqliteProductStore::new(&db_path).expect("Failed to create product store"),
        );
        let settings_store: Arc<dyn SettingsStore> = Arc::new(
            SqliteSettingsStore::new(&db_path, &config.settings.prefix)
                .expect("Failed to create settings store")
                .with_registry(&registry),
        );

        let wizard = test_config.enable_provisioning.then(|| {
            Arc::new(WizardSession::new(
                Arc::new(server.clone()) as Arc<dyn AdServerAdapter>,
                workflow_config,
                Arc::clone(&registry),
            ))
        });

        let state = Arc::new(AppState::new(
            config,
            product_store,
            settings_store,
            registry,
            wizard,
        ));

        Self {
            router: create_router(state),
            server,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Wire the wizard to the mock ad server
    pub enable_provisioning: bool,
    pub batch_size: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enable_provisioning: true,
            batch_size: 100,
        }
    }
}

impl TestConfig {
    /// Create config without a remote ad server.
    pub fn without_provisioning() -> Self {
        Self {
            enable_provisioning: false,
            ..Self::default()
        }
    }
}

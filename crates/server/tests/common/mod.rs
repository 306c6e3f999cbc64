//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock fetcher injected, so the full sync flow can be exercised
//! without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use pokeindex_core::{
    create_sync_system,
    testing::{MockFetcher, MockRecordStore},
    Config, DatabaseConfig, Fetcher, RecordStore, SyncConfig, SyncHandle,
};
use pokeindex_server::api::create_router;
use pokeindex_server::state::AppState;

/// Re-export fixtures for test convenience
pub use pokeindex_core::testing::fixtures;

/// Catalog page size used by every fixture.
pub const PAGE_SIZE: u32 = 2;

/// Test fixture for API testing with a mock fetcher.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sync() {
///     let fixture = TestFixture::new().await;
///     fixture.serve_catalog(&[("clefairy", 35)]).await;
///
///     let response = fixture.post("/api/v1/sync").await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - configure upstream responses
    pub fetcher: Arc<MockFetcher>,
    /// Record store - inject read/write failures
    pub store: Arc<MockRecordStore>,
    /// Handle to the running sync controller
    pub sync: SyncHandle,
    controller: JoinHandle<()>,
    _temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path,
            },
            api: fixtures::api_config(PAGE_SIZE),
            sync: SyncConfig {
                sync_on_startup: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MockRecordStore::new().expect("Failed to create record store"));

        let (sync, controller) = create_sync_system(
            fixtures::sync_options(PAGE_SIZE),
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );
        let controller = tokio::spawn(controller.run());

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn RecordStore>,
            sync.clone(),
        ));
        let router = create_router(state);

        Self {
            router,
            fetcher,
            store,
            sync,
            controller,
            _temp_dir: temp_dir,
        }
    }

    /// Serve a single catalog page listing `(name, id)` entries.
    pub async fn serve_catalog(&self, entries: &[(&str, u32)]) {
        self.fetcher
            .set_json(
                &fixtures::page_url(0, PAGE_SIZE),
                &fixtures::catalog_page(entries.len() as u32, None, entries),
            )
            .await;
    }

    /// Serve Clefairy's details and sprite.
    pub async fn serve_clefairy(&self) {
        self.fetcher
            .set_json(&fixtures::detail_url(35), &fixtures::clefairy_details())
            .await;
        self.fetcher
            .set_response(&fixtures::image_url(35), fixtures::PNG_BYTES)
            .await;
    }

    /// Wait until the controller has no request in flight.
    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.sync.wait_idle())
            .await
            .expect("sync did not settle in time")
            .expect("controller stopped");
    }

    /// Stop the sync controller while keeping the router alive.
    pub async fn stop_controller(&mut self) {
        self.controller.abort();
        let _ = (&mut self.controller).await;
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
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
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            content_type,
            bytes,
            body,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

//! Mock fetcher for testing.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::pokeapi::{FetchError, Fetcher};

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Return canned bodies per URL (unknown URLs answer 404)
/// - Fail specific URLs with a status code
/// - Record every requested URL for assertions
/// - Hold requests in flight until released
///
/// # Example
///
/// ```rust,ignore
/// use pokeindex_core::testing::{MockFetcher, fixtures};
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_json(&fixtures::page_url(0, 2), &fixtures::catalog_page(1, None, &[])).await;
///
/// fetcher.hold();
/// // ... trigger syncs, observe the request is in flight ...
/// fetcher.release();
///
/// assert_eq!(fetcher.request_count(&fixtures::page_url(0, 2)).await, 1);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    /// Canned response bodies by URL.
    responses: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// URLs that fail with the given HTTP status.
    failures: Arc<RwLock<HashMap<String, u16>>>,
    /// Every URL requested, in order.
    requests: Arc<RwLock<Vec<String>>>,
    /// While true, fetches wait before answering.
    gate: watch::Sender<bool>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher with no canned responses.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            responses: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            gate,
        }
    }

    /// Answer `url` with `body`.
    pub async fn set_response(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), body.into());
    }

    /// Answer `url` with a JSON document.
    pub async fn set_json(&self, url: &str, value: &serde_json::Value) {
        self.set_response(url, value.to_string()).await;
    }

    /// Make `url` fail with `status` until [`clear_failure`](Self::clear_failure).
    pub async fn fail_url(&self, url: &str, status: u16) {
        self.failures.write().await.insert(url.to_string(), status);
    }

    pub async fn clear_failure(&self, url: &str) {
        self.failures.write().await.remove(url);
    }

    /// All requested URLs, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    /// How many times `url` was requested.
    pub async fn request_count(&self, url: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// Keep new and waiting fetches in flight until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(true);
    }

    /// Let held fetches answer.
    pub fn release(&self) {
        self.gate.send_replace(false);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let key = url.to_string();
        self.requests.write().await.push(key.clone());

        let mut gate = self.gate.subscribe();
        // Sender lives in self, so the channel cannot close here.
        let _ = gate.wait_for(|held| !*held).await;

        if let Some(status) = self.failures.read().await.get(&key) {
            return Err(FetchError::Status {
                status: *status,
                url: key,
            });
        }

        match self.responses.read().await.get(&key) {
            Some(body) => Ok(body.clone()),
            None => Err(FetchError::Status {
                status: 404,
                url: key,
            }),
        }
    }
}

//! Upstream PokeAPI access.
//!
//! This module provides the `Fetcher` abstraction used by the sync controller
//! to issue GET requests, an HTTP implementation backed by reqwest, and
//! decoders for the catalog page and detail response schemas.

mod client;
mod types;

pub use client::HttpFetcher;
pub use types::{decode_details, decode_page, CatalogPage};

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connection, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

/// Performs a GET and returns the raw body.
///
/// Implementations do not retry; the sync controller treats every error as
/// final for the current attempt.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body at `url`.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

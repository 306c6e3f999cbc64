use thiserror::Error;

use crate::pokeapi::FetchError;
use crate::store::StoreError;

/// Errors surfaced by sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No data received from {0}")]
    NoData(String),

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store write failed: {0}")]
    StoreWriteFailed(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Sync controller is not running")]
    ControllerStopped,
}

impl SyncError {
    /// Map a store error hit while reading.
    pub fn store_read(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => SyncError::StoreUnavailable(msg),
            other => SyncError::StoreUnavailable(other.to_string()),
        }
    }

    /// Map a store error hit while writing.
    pub fn store_write(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => SyncError::StoreUnavailable(msg),
            other => SyncError::StoreWriteFailed(other.to_string()),
        }
    }

    /// Whether the failure came from local persistence rather than the remote side.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            SyncError::StoreUnavailable(_) | SyncError::StoreWriteFailed(_)
        )
    }
}

//! Local persistence for cached records and catalog resume state.
//!
//! The record store is a staged-write store: `insert` stages a record and
//! `save_all` commits everything staged in one durable transaction. Resume
//! state lives in a separate key-value table owned by the same database, so
//! `reset_all` can wipe records and progress together.

mod resume;
mod sqlite;

pub use resume::SqliteResumeStore;
pub use sqlite::SqliteRecordStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::pokemon::PokemonRecord;

/// Errors for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Change notification emitted after durable writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Records with these names were committed.
    Saved { names: Vec<String> },
    /// All records were deleted.
    Cleared,
}

/// Trait for cached record storage.
pub trait RecordStore: Send + Sync {
    /// Find a record by exact, case-sensitive name. Staged records are visible.
    fn find_by_name(&self, name: &str) -> Result<Option<PokemonRecord>, StoreError>;

    /// Find a record by numeric id. Staged records are visible.
    fn find_by_numeric_id(&self, id: u32) -> Result<Option<PokemonRecord>, StoreError>;

    /// Stage a record for the next save, replacing any staged record with the same name.
    fn insert(&self, record: PokemonRecord) -> Result<(), StoreError>;

    /// Commit all staged records in one transaction, upserting by name.
    ///
    /// Returns the number of records written. On failure the staged records
    /// are discarded.
    fn save_all(&self) -> Result<usize, StoreError>;

    /// Drop staged records without writing them. Returns how many were dropped.
    fn discard_staged(&self) -> Result<usize, StoreError>;

    /// Delete every record, including staged ones.
    fn delete_all(&self) -> Result<(), StoreError>;

    /// Delete every record and clear the resume state in one transaction.
    ///
    /// On failure neither is changed.
    fn reset_all(&self) -> Result<(), StoreError>;

    /// Resume state stored alongside the records.
    fn resume(&self) -> &dyn ResumeStore;

    /// List saved records ordered by numeric id, then name.
    fn list(&self, limit: u32, offset: u32) -> Result<Vec<PokemonRecord>, StoreError>;

    /// Count saved records.
    fn count(&self) -> Result<u64, StoreError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Checkpoint for resumable catalog pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    /// Next catalog page to fetch; `None` means start from the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
    /// Set once the last page has been merged.
    #[serde(default)]
    pub all_pages_downloaded: bool,
}

impl ResumeState {
    /// State after the last page has been merged.
    pub fn complete() -> Self {
        Self {
            next_page_url: None,
            all_pages_downloaded: true,
        }
    }

    /// State pointing at the next page to fetch.
    pub fn at_page(url: impl Into<String>) -> Self {
        Self {
            next_page_url: Some(url.into()),
            all_pages_downloaded: false,
        }
    }
}

/// Trait for resume state persistence.
pub trait ResumeStore: Send + Sync {
    /// Load the persisted state (default when nothing was saved).
    fn load(&self) -> Result<ResumeState, StoreError>;

    /// Persist the state, replacing what was there.
    fn save(&self, state: &ResumeState) -> Result<(), StoreError>;

    /// Reset to the default state.
    fn clear(&self) -> Result<(), StoreError>;
}

//! Incremental fetch-and-sync of the remote catalog into the local store.
//!
//! A single [`SyncController`] owns all sync state. Callers talk to it through
//! a cloneable [`SyncHandle`]:
//!
//! - `sync_all_catalog` walks catalog pages in order, merging each page
//!   before requesting the next and checkpointing progress in the store's
//!   resume state.
//! - `start_next_download` enriches one record: details first, then its image.
//! - `reset_all` wipes records and progress; late results from before the
//!   reset are dropped.
//!
//! At most one request per URL is ever in flight.

mod controller;
mod error;
mod handle;
pub mod merge;
mod pending;
mod types;

pub use controller::SyncController;
pub use error::SyncError;
pub use handle::SyncHandle;
pub use merge::MergeSummary;
pub use pending::PendingRequests;
pub use types::*;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::pokeapi::Fetcher;
use crate::store::RecordStore;

const EVENT_BUFFER: usize = 256;

/// Create a complete sync system
///
/// Returns:
/// - `SyncHandle` - for issuing commands (clone this to share across tasks)
/// - `SyncController` - spawn this as a background task with `tokio::spawn(controller.run())`
pub fn create_sync_system(
    options: SyncOptions,
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn Fetcher>,
) -> (SyncHandle, SyncController) {
    let (tx, rx) = mpsc::channel(options.channel_buffer.max(1));
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    let controller = SyncController::new(
        options,
        store,
        fetcher,
        rx,
        tx.downgrade(),
        events.clone(),
    );
    (SyncHandle::new(tx, events), controller)
}

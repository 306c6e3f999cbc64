use chrono::{DateTime, Utc};
use pokeindex_core::{Config, RecordStore, SyncHandle};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn RecordStore>,
    sync: SyncHandle,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>, sync: SyncHandle) -> Self {
        Self {
            config,
            store,
            sync,
            started_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

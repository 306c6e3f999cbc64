use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::SyncOperation;

/// Registry of URLs with a request in flight.
///
/// At most one request per URL may be outstanding; a second attempt for the
/// same URL is refused until the first one finishes.
#[derive(Debug, Default)]
pub struct PendingRequests {
    in_flight: HashMap<String, SyncOperation>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url`. Returns false if a request for it is already outstanding.
    pub fn try_begin(&mut self, url: &str, operation: SyncOperation) -> bool {
        match self.in_flight.entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(operation);
                true
            }
        }
    }

    /// Release `url`, returning the operation it was registered for.
    pub fn finish(&mut self, url: &str) -> Option<SyncOperation> {
        self.in_flight.remove(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.in_flight.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Number of outstanding requests of one kind.
    pub fn count(&self, operation: SyncOperation) -> usize {
        self.in_flight.values().filter(|op| **op == operation).count()
    }
}

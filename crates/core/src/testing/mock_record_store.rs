//! Record store with failure injection for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::pokemon::PokemonRecord;
use crate::store::{RecordStore, ResumeStore, SqliteRecordStore, StoreChange, StoreError};

/// In-memory record store whose reads or writes can be made to fail.
///
/// Backed by a real in-memory [`SqliteRecordStore`], so staging and upsert
/// behave exactly like production.
pub struct MockRecordStore {
    inner: SqliteRecordStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_name: Mutex<Option<String>>,
}

impl MockRecordStore {
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self {
            inner: SqliteRecordStore::in_memory()?,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_name: Mutex::new(None),
        })
    }

    /// Make lookups fail with `StoreError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `save_all`, `delete_all` and `reset_all` fail with `StoreError::Database`.
    ///
    /// Resume state is unaffected.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make lookups of one record name fail; `None` restores normal reads.
    pub fn set_fail_reads_for(&self, name: Option<&str>) {
        if let Ok(mut fail_name) = self.fail_name.lock() {
            *fail_name = name.map(str::to_string);
        }
    }

    fn check_read_name(&self, name: &str) -> Result<(), StoreError> {
        self.check_read()?;
        let fail_name = self
            .fail_name
            .lock()
            .map_err(|_| StoreError::Unavailable("mock lock poisoned".to_string()))?;
        if fail_name.as_deref() == Some(name) {
            return Err(StoreError::Unavailable(format!("mock read failure for {}", name)));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mock read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("mock write failure".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for MockRecordStore {
    fn find_by_name(&self, name: &str) -> Result<Option<PokemonRecord>, StoreError> {
        self.check_read_name(name)?;
        self.inner.find_by_name(name)
    }

    fn find_by_numeric_id(&self, id: u32) -> Result<Option<PokemonRecord>, StoreError> {
        self.check_read()?;
        self.inner.find_by_numeric_id(id)
    }

    fn insert(&self, record: PokemonRecord) -> Result<(), StoreError> {
        self.inner.insert(record)
    }

    fn save_all(&self) -> Result<usize, StoreError> {
        if let Err(e) = self.check_write() {
            // Same contract as the real store: staged records are dropped.
            self.inner.discard_staged()?;
            return Err(e);
        }
        self.inner.save_all()
    }

    fn discard_staged(&self) -> Result<usize, StoreError> {
        self.inner.discard_staged()
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.delete_all()
    }

    fn reset_all(&self) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.reset_all()
    }

    fn list(&self, limit: u32, offset: u32) -> Result<Vec<PokemonRecord>, StoreError> {
        self.check_read()?;
        self.inner.list(limit, offset)
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.check_read()?;
        self.inner.count()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.subscribe()
    }

    fn resume(&self) -> &dyn ResumeStore {
        self.inner.resume()
    }
}

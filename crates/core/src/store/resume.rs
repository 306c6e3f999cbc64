//! SQLite-backed key-value store for the catalog resume state.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{ResumeState, ResumeStore, StoreError};

const KEY_CURRENT_PAGE_URL: &str = "currentPageUrl";
const KEY_HAVE_DOWNLOADED_ALL_PAGES: &str = "haveDownloadedAllPages";

/// Resume state persisted as simple settings rows.
///
/// Shares its connection with the [`SqliteRecordStore`](super::SqliteRecordStore)
/// that created it, so a full reset can clear records and settings in one
/// transaction.
pub struct SqliteResumeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResumeStore {
    pub(super) fn attached(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Remove the resume keys using `conn`, which may be an open transaction.
    pub(super) fn clear_in(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM settings WHERE key IN (?, ?)",
            params![KEY_CURRENT_PAGE_URL, KEY_HAVE_DOWNLOADED_ALL_PAGES],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn get(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl ResumeStore for SqliteResumeStore {
    fn load(&self) -> Result<ResumeState, StoreError> {
        let conn = self.lock_conn()?;
        let next_page_url = Self::get(&conn, KEY_CURRENT_PAGE_URL)?;
        let all_pages_downloaded = Self::get(&conn, KEY_HAVE_DOWNLOADED_ALL_PAGES)?
            .map(|value| value == "true")
            .unwrap_or(false);

        Ok(ResumeState {
            next_page_url,
            all_pages_downloaded,
        })
    }

    fn save(&self, state: &ResumeState) -> Result<(), StoreError> {
        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match state.next_page_url {
            Some(ref url) => tx.execute(
                "INSERT INTO settings (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![KEY_CURRENT_PAGE_URL, url],
            ),
            None => tx.execute(
                "DELETE FROM settings WHERE key = ?",
                params![KEY_CURRENT_PAGE_URL],
            ),
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.execute(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![
                KEY_HAVE_DOWNLOADED_ALL_PAGES,
                state.all_pages_downloaded.to_string()
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        Self::clear_in(&conn)
    }
}

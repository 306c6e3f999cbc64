//! SQLite-backed record store implementation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;

use super::{RecordStore, ResumeStore, SqliteResumeStore, StoreChange, StoreError};
use crate::pokemon::PokemonRecord;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

const SELECT_COLUMNS: &str = "SELECT name, detail_url, numeric_id, height_decimeters, weight_hectograms,
        base_experience, sort_order, image_url, image_bytes, statistics, types
     FROM pokemon";

/// SQLite-backed record store.
///
/// Owns the resume settings of the same database; see [`RecordStore::resume`].
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    resume: SqliteResumeStore,
    staged: Mutex<BTreeMap<String, PokemonRecord>>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteRecordStore {
    /// Create a new SQLite record store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite record store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::initialize_schema(&conn)?;
        SqliteResumeStore::initialize_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            resume: SqliteResumeStore::attached(Arc::clone(&conn)),
            conn,
            staged: Mutex::new(BTreeMap::new()),
            changes,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            -- One row per Pokémon, keyed by its unique name
            CREATE TABLE IF NOT EXISTS pokemon (
                name TEXT PRIMARY KEY,
                detail_url TEXT NOT NULL,
                numeric_id INTEGER NOT NULL DEFAULT 0,
                height_decimeters INTEGER NOT NULL DEFAULT 0,
                weight_hectograms INTEGER NOT NULL DEFAULT 0,
                base_experience INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                image_url TEXT,
                image_bytes BLOB,
                statistics TEXT NOT NULL DEFAULT '[]',
                types TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pokemon_numeric_id ON pokemon(numeric_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn lock_staged(&self) -> Result<MutexGuard<'_, BTreeMap<String, PokemonRecord>>, StoreError> {
        self.staged
            .lock()
            .map_err(|_| StoreError::Unavailable("staging lock poisoned".to_string()))
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<PokemonRecord> {
        let statistics_json: String = row.get(9)?;
        let types_json: String = row.get(10)?;

        let statistics = Self::parse_json_column(9, &statistics_json)?;
        let types = Self::parse_json_column(10, &types_json)?;

        Ok(PokemonRecord {
            name: row.get(0)?,
            detail_url: row.get(1)?,
            numeric_id: row.get(2)?,
            height_decimeters: row.get(3)?,
            weight_hectograms: row.get(4)?,
            base_experience: row.get(5)?,
            sort_order: row.get(6)?,
            image_url: row.get(7)?,
            image_bytes: row.get(8)?,
            statistics,
            types,
        })
    }

    fn parse_json_column<T: serde::de::DeserializeOwned>(
        index: usize,
        json: &str,
    ) -> rusqlite::Result<T> {
        serde_json::from_str(json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

impl RecordStore for SqliteRecordStore {
    fn find_by_name(&self, name: &str) -> Result<Option<PokemonRecord>, StoreError> {
        if let Some(record) = self.lock_staged()?.get(name) {
            return Ok(Some(record.clone()));
        }

        let conn = self.lock_conn()?;
        conn.query_row(
            &format!("{} WHERE name = ?", SELECT_COLUMNS),
            params![name],
            Self::row_to_record,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn find_by_numeric_id(&self, id: u32) -> Result<Option<PokemonRecord>, StoreError> {
        // 0 marks an unknown id
        if id == 0 {
            return Ok(None);
        }

        if let Some(record) = self
            .lock_staged()?
            .values()
            .find(|record| record.numeric_id == id)
        {
            return Ok(Some(record.clone()));
        }

        let conn = self.lock_conn()?;
        conn.query_row(
            &format!("{} WHERE numeric_id = ? ORDER BY name LIMIT 1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn insert(&self, record: PokemonRecord) -> Result<(), StoreError> {
        self.lock_staged()?.insert(record.name.clone(), record);
        Ok(())
    }

    fn save_all(&self) -> Result<usize, StoreError> {
        let staged = std::mem::take(&mut *self.lock_staged()?);
        if staged.is_empty() {
            return Ok(0);
        }

        let now_str = Utc::now().to_rfc3339();
        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for record in staged.values() {
            let statistics = serde_json::to_string(&record.statistics)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let types = serde_json::to_string(&record.types)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            tx.execute(
                "INSERT INTO pokemon (name, detail_url, numeric_id, height_decimeters, weight_hectograms,
                    base_experience, sort_order, image_url, image_bytes, statistics, types, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(name) DO UPDATE SET
                    detail_url = excluded.detail_url,
                    numeric_id = excluded.numeric_id,
                    height_decimeters = excluded.height_decimeters,
                    weight_hectograms = excluded.weight_hectograms,
                    base_experience = excluded.base_experience,
                    sort_order = excluded.sort_order,
                    image_url = excluded.image_url,
                    image_bytes = excluded.image_bytes,
                    statistics = excluded.statistics,
                    types = excluded.types,
                    updated_at = excluded.updated_at",
                params![
                    &record.name,
                    &record.detail_url,
                    record.numeric_id,
                    record.height_decimeters,
                    record.weight_hectograms,
                    record.base_experience,
                    record.sort_order,
                    &record.image_url,
                    &record.image_bytes,
                    &statistics,
                    &types,
                    &now_str,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        drop(conn);

        let names: Vec<String> = staged.into_keys().collect();
        let written = names.len();
        self.notify(StoreChange::Saved { names });

        Ok(written)
    }

    fn discard_staged(&self) -> Result<usize, StoreError> {
        let mut staged = self.lock_staged()?;
        let dropped = staged.len();
        staged.clear();
        Ok(dropped)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.lock_staged()?.clear();

        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM pokemon", [])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        drop(conn);

        self.notify(StoreChange::Cleared);
        Ok(())
    }

    fn reset_all(&self) -> Result<(), StoreError> {
        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.execute("DELETE FROM pokemon", [])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        SqliteResumeStore::clear_in(&tx)?;

        tx.commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        drop(conn);

        self.lock_staged()?.clear();
        self.notify(StoreChange::Cleared);
        Ok(())
    }

    fn list(&self, limit: u32, offset: u32) -> Result<Vec<PokemonRecord>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "{} ORDER BY CASE WHEN numeric_id = 0 THEN 1 ELSE 0 END, numeric_id, name
                 LIMIT ? OFFSET ?",
                SELECT_COLUMNS
            ))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit, offset], Self::row_to_record)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(records)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock_conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM pokemon", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn resume(&self) -> &dyn ResumeStore {
        &self.resume
    }
}

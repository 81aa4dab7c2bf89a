//! SQLite-backed state store.
//! One keyed table instead of one file per reservation; each save is a
//! single `INSERT OR REPLACE`, so readers never see a half-written row.

use railwatch_core::error::StorageError;
use railwatch_core::traits::StateStore;
use railwatch_core::types::{CacheKey, PersistedState};
use rusqlite::OptionalExtension;
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed persistence store for entity state.
pub struct SqliteStateStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStateStore {
    /// Open or create the state database.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| StorageError::Database(format!("DB open: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS entity_state (
                cache_key TEXT PRIMARY KEY,
                fingerprint TEXT NOT NULL,
                cache_time TEXT NOT NULL DEFAULT '',
                checked_at TEXT NOT NULL DEFAULT ''
            );
         ",
            )
            .map_err(|e| StorageError::Database(format!("Migration: {e}")))
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".into()))
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self, key: &CacheKey) -> Result<PersistedState, StorageError> {
        let row = self
            .conn()?
            .query_row(
                "SELECT fingerprint, cache_time, checked_at FROM entity_state WHERE cache_key = ?1",
                rusqlite::params![key.as_str()],
                |row| {
                    Ok(PersistedState {
                        fingerprint: row.get(0)?,
                        cache_time: row.get(1)?,
                        checked_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| StorageError::Database(format!("Load state: {e}")))?;
        Ok(row.unwrap_or_default())
    }

    fn save(&self, key: &CacheKey, state: &PersistedState) -> Result<(), StorageError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO entity_state (cache_key, fingerprint, cache_time, checked_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    key.as_str(),
                    state.fingerprint,
                    state.cache_time,
                    state.checked_at,
                ],
            )
            .map_err(|e| StorageError::Database(format!("Save state: {e}")))?;
        tracing::debug!("💾 Saved state for {key} to sqlite");
        Ok(())
    }
}

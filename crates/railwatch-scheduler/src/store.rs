//! File-based state store — one plain-text file per CacheKey.
//!
//! File content: `{fingerprint}_CacheTime: {cache_time}_CheckedAt: {checked_at}`.
//! Files are rewritten whole on every save, never appended.

use railwatch_core::error::StorageError;
use railwatch_core::traits::StateStore;
use railwatch_core::types::{CacheKey, PersistedState};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const CACHE_TIME_MARKER: &str = "_CacheTime: ";
const CHECKED_AT_MARKER: &str = "_CheckedAt: ";

/// Render a state into the on-disk text template.
pub fn render_state(state: &PersistedState) -> String {
    format!(
        "{}{CACHE_TIME_MARKER}{}{CHECKED_AT_MARKER}{}",
        state.fingerprint, state.cache_time, state.checked_at
    )
}

/// Parse the on-disk text template. Text without markers is a bare fingerprint.
///
/// Both markers are matched at their last occurrence. `checked_at` is our own
/// timestamp and never holds a marker, so the fingerprint may contain either
/// marker and `cache_time` may contain `_CheckedAt: `. A `cache_time` holding
/// `_CacheTime: ` does not round-trip.
pub fn parse_state(content: &str) -> PersistedState {
    let (head, checked_at) = match content.rfind(CHECKED_AT_MARKER) {
        Some(i) => (&content[..i], &content[i + CHECKED_AT_MARKER.len()..]),
        None => (content, ""),
    };
    let (fingerprint, cache_time) = match head.rfind(CACHE_TIME_MARKER) {
        Some(i) => (&head[..i], &head[i + CACHE_TIME_MARKER.len()..]),
        None => (head, ""),
    };
    PersistedState {
        fingerprint: fingerprint.to_string(),
        cache_time: cache_time.to_string(),
        checked_at: checked_at.to_string(),
    }
}

/// File-per-key state store.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn file_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.txt"))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &CacheKey) -> Result<PersistedState, StorageError> {
        let file = self.file_for(key);
        match std::fs::read_to_string(&file) {
            Ok(content) => Ok(parse_state(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("🆕 No state for {key}, starting empty");
                Ok(PersistedState::default())
            }
            Err(source) => Err(StorageError::Io {
                path: file.display().to_string(),
                source,
            }),
        }
    }

    fn save(&self, key: &CacheKey, state: &PersistedState) -> Result<(), StorageError> {
        let file = self.file_for(key);
        let tmp = self.dir.join(format!("{key}.txt.tmp"));
        std::fs::write(&tmp, render_state(state)).map_err(|source| StorageError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp, &file).map_err(|source| StorageError::Io {
            path: file.display().to_string(),
            source,
        })?;
        tracing::debug!("💾 Saved state for {key} to {}", file.display());
        Ok(())
    }
}

/// In-memory state store, for dry runs and tests.
#[derive(Default)]
pub struct MemoryStateStore {
    slots: Mutex<HashMap<CacheKey, PersistedState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &CacheKey) -> Result<PersistedState, StorageError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::Database("state lock poisoned".into()))?;
        Ok(slots.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &CacheKey, state: &PersistedState) -> Result<(), StorageError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::Database("state lock poisoned".into()))?;
        slots.insert(key.clone(), state.clone());
        Ok(())
    }
}

//! Seams between the reconciliation loop and its collaborators.

use async_trait::async_trait;

use crate::error::{FetchError, StorageError};
use crate::types::{CacheKey, PersistedState, StatusSnapshot, TrackedEntity};

/// Retrieves the current status of one reservation.
///
/// One outbound call per invocation. Implementations must not retry or cache.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, entity: &TrackedEntity) -> Result<StatusSnapshot, FetchError>;
}

/// Durable last-known state, one slot per [`CacheKey`].
pub trait StateStore: Send + Sync {
    /// Returns the empty state when nothing has been saved under `key` yet.
    fn load(&self, key: &CacheKey) -> Result<PersistedState, StorageError>;

    /// Replace the slot for `key`. A concurrent `load` never sees a partial write.
    fn save(&self, key: &CacheKey, state: &PersistedState) -> Result<(), StorageError>;
}

//! # Railwatch Core
//!
//! Domain types, configuration and the traits every other crate plugs into.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod traits;
pub mod types;

pub use config::{DetectionMode, StoreBackend, WatchConfig};
pub use error::{
    ConfigError, DispatchError, FetchError, KeyError, RoutingError, StorageError,
    WatchError,
};
pub use fingerprint::{FingerprintEntry, StatusFingerprint};
pub use traits::{StateStore, StatusFetcher};
pub use types::{
    CacheKey, NotificationMessage, PassengerStatus, PersistedState, RoutingTarget,
    StatusSnapshot, TrackedEntity,
};

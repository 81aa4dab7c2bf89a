//! Error types shared across Railwatch crates.
//!
//! Each stage of the reconciliation loop has its own error kind so a batch
//! report can say exactly where an entity stopped.

use thiserror::Error;

/// CacheKey derivation failed for an identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("identifier '{identifier}' is too short: need at least {min} characters")]
    TooShort { identifier: String, min: usize },

    #[error("identifier '{identifier}' ends in characters that are not storage-safe")]
    UnsafeSuffix { identifier: String },
}

/// Contacting the status provider failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS or timeout failure.
    #[error("request to status provider failed: {0}")]
    Transport(String),

    #[error("status provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the JSON shape we expect.
    #[error("malformed status payload: {0}")]
    Payload(String),
}

/// Reading or writing persisted state failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(String),
}

/// The routing tables cannot serve an entity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("entity index {index} is outside the batch of {batch_size}")]
    IndexOutOfBatch { index: usize, batch_size: usize },

    #[error("no notification queue configured for entity index {index} ({configured} queues configured)")]
    MissingQueue { index: usize, configured: usize },
}

/// One notification channel attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{channel} channel unreachable: {reason}")]
    Unreachable { channel: String, reason: String },

    #[error("{channel} channel answered HTTP {status}")]
    Rejected { channel: String, status: u16 },

    /// No channel made an attempt: all disabled, or only recipient-driven
    /// channels enabled and the slot is empty.
    #[error("no notification channel made an attempt for {uri}")]
    NothingSent { uri: String },
}

/// Configuration could not be acquired or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Umbrella error recorded against an entity in a batch report.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

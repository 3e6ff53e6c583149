use thiserror::Error;

use crate::models::SourceKind;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite operation failed: {0}")]
    SQLite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StorageError::Lock(err.to_string())
    }
}

/// Failures that end a collection cycle without committing anything.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("every bucket for source '{0}' came back empty; nothing was written")]
    EmptyBatch(SourceKind),

    #[error("a cycle for source '{0}' is already running")]
    CycleInProgress(SourceKind),

    #[error("no fetcher registered for source '{0}'")]
    NoFetcher(SourceKind),

    #[error("persistent store is not available for source '{0}'")]
    StoreUnavailable(SourceKind),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

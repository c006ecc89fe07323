use thiserror::Error;

/// Errors raised by the preference persistence layer.
///
/// Read-side failures are never surfaced to callers: the knowledge layer
/// substitutes the default history and logs. Write-side failures are logged
/// at `warn` and swallowed so a broken store degrades the loop silently.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

use thiserror::Error;

/// Failure of the local persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    #[error("{0} does not hold user drafts")]
    NotADraft(crate::store::Partition),

    #[error("storage connection poisoned")]
    Poisoned,
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

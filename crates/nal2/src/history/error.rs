use thiserror::Error;

use super::HistoryId;

/// History store errors
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History record not found: {0}")]
    NotFound(HistoryId),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] crate::storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

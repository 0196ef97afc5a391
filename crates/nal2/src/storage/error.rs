use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid content in {path}: {message}")]
    InvalidContent { path: String, message: String },

    #[error("Storage error: {0}")]
    Other(String),
}

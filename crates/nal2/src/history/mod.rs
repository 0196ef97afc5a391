//! Current-params slot and capped call history of the relay topology.

pub mod error;
pub mod file_repository;
pub mod in_memory_repository;
pub mod model;
pub mod repository;
pub mod service;

pub use error::{HistoryError, Result};
pub use file_repository::JsonFileHistoryRepository;
pub use in_memory_repository::InMemoryHistoryRepository;
pub use model::{
    CurrentParams, HistoryDocument, HistoryId, HistoryPatch, HistoryRecord, SavedRecord,
    UNKNOWN_FUNCTION, extract_function,
};
pub use repository::HistoryRepository;
pub use service::HistoryService;

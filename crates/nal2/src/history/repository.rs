use async_trait::async_trait;

use super::{HistoryDocument, Result};

/// Repository trait for the history document
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Load the whole document; a store that was never written yields the empty document
    async fn load(&self) -> Result<HistoryDocument>;

    /// Replace the whole document
    async fn save(&self, document: &HistoryDocument) -> Result<()>;
}

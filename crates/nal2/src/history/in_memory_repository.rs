use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{HistoryDocument, HistoryRepository, Result};

/// In-memory implementation of HistoryRepository
#[derive(Clone, Default)]
pub struct InMemoryHistoryRepository {
    document: Arc<RwLock<HistoryDocument>>,
}

impl InMemoryHistoryRepository {
    /// Create a new in-memory history repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn load(&self) -> Result<HistoryDocument> {
        Ok(self.document.read().await.clone())
    }

    async fn save(&self, document: &HistoryDocument) -> Result<()> {
        *self.document.write().await = document.clone();
        Ok(())
    }
}

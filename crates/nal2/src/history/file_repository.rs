use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{HistoryDocument, HistoryError, HistoryRepository, Result};
use crate::storage::Storage;

/// History repository persisted as one pretty-printed JSON document
#[derive(Clone)]
pub struct JsonFileHistoryRepository {
    storage: Arc<dyn Storage>,
    path: String,
}

impl JsonFileHistoryRepository {
    pub fn new(storage: Arc<dyn Storage>, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }

    /// Write the empty document if the file does not exist yet.
    pub async fn init(&self) -> Result<()> {
        if !self.storage.exists(&self.path).await? {
            info!("Creating history store at {}", self.path);
            self.save(&HistoryDocument::default()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for JsonFileHistoryRepository {
    async fn load(&self) -> Result<HistoryDocument> {
        if !self.storage.exists(&self.path).await? {
            return Ok(HistoryDocument::default());
        }
        let content = self.storage.read(&self.path).await?;
        serde_json::from_slice(&content).map_err(|e| {
            HistoryError::Serialization(format!("Failed to parse {}: {}", self.path, e))
        })
    }

    async fn save(&self, document: &HistoryDocument) -> Result<()> {
        let content = serde_json::to_vec_pretty(document).map_err(|e| {
            HistoryError::Serialization(format!("Failed to serialize history: {}", e))
        })?;
        self.storage.write(&self.path, &content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::CurrentParams;
    use crate::storage::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()));
        let repo = JsonFileHistoryRepository::new(storage.clone(), "data.json");

        repo.init().await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&storage.read("data.json").await.unwrap()).unwrap();
        assert_eq!(raw, json!({"currentParams": {"input": "", "output": ""}, "history": []}));

        let document = HistoryDocument {
            current_params: CurrentParams::new(Some(json!({"function": "GetMLE"})), None),
            history: vec![],
        };
        repo.save(&document).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), document);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()));
        storage.write("data.json", b"{broken").await.unwrap();

        let repo = JsonFileHistoryRepository::new(storage, "data.json");
        assert!(matches!(repo.load().await, Err(HistoryError::Serialization(_))));
    }
}

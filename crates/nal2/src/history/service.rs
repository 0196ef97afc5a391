use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{
    CurrentParams, HistoryDocument, HistoryError, HistoryId, HistoryPatch, HistoryRecord,
    HistoryRepository, Result, SavedRecord, extract_function,
};
use crate::config::StoreConfig;

/// Service for the current-params slot and the capped call history.
///
/// Every mutation is a read-modify-write of the whole document and runs
/// under one lock, so concurrent writers never lose each other's changes.
pub struct HistoryService {
    repository: Arc<dyn HistoryRepository>,
    limit: usize,
    /// Last issued record id; guards all writes
    write_lock: Mutex<i64>,
}

impl HistoryService {
    /// Create a new HistoryService
    pub fn new(repository: Arc<dyn HistoryRepository>) -> Self {
        Self::with_config(repository, &StoreConfig::default())
    }

    /// Create a new HistoryService with config
    pub fn with_config(repository: Arc<dyn HistoryRepository>, config: &StoreConfig) -> Self {
        Self {
            repository,
            limit: config.history_limit,
            write_lock: Mutex::new(0),
        }
    }

    /// Load the document, treating an unreadable store as empty.
    async fn load_or_default(&self) -> HistoryDocument {
        match self.repository.load().await {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to read history store, using empty document: {}", e);
                HistoryDocument::default()
            }
        }
    }

    pub async fn current_params(&self) -> CurrentParams {
        self.load_or_default().await.current_params
    }

    pub async fn set_current_params(
        &self,
        input: Option<Value>,
        output: Option<Value>,
    ) -> Result<CurrentParams> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_or_default().await;
        document.current_params = CurrentParams::new(input, output);
        self.repository.save(&document).await?;
        Ok(document.current_params)
    }

    /// All records, most recent first.
    pub async fn list(&self) -> Vec<HistoryRecord> {
        self.load_or_default().await.history
    }

    /// Save a call under the function name found in `input`.
    ///
    /// A record for the same function is overwritten in place, keeping its id
    /// and position. Otherwise a new record goes to the front and the list is
    /// cut back to the configured limit.
    pub async fn save(&self, input: Option<Value>, output: Option<Value>) -> Result<SavedRecord> {
        let mut last_id = self.write_lock.lock().await;
        let mut document = self.load_or_default().await;

        let CurrentParams { input, output } = CurrentParams::new(input, output);
        let function = extract_function(&input);
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let saved = match document
            .history
            .iter_mut()
            .find(|record| record.function == function)
        {
            Some(record) => {
                record.input = input;
                record.output = output;
                record.timestamp = timestamp;
                SavedRecord {
                    record: record.clone(),
                    updated: true,
                }
            }
            None => {
                let newest = document
                    .history
                    .iter()
                    .map(|record| record.id.value())
                    .max()
                    .unwrap_or(0);
                let id = Utc::now().timestamp_millis().max(*last_id + 1).max(newest + 1);
                *last_id = id;

                let record = HistoryRecord {
                    id: HistoryId::new(id),
                    function,
                    input,
                    output,
                    timestamp,
                    name: None,
                };
                document.history.insert(0, record.clone());
                document.history.truncate(self.limit);
                SavedRecord {
                    record,
                    updated: false,
                }
            }
        };

        self.repository.save(&document).await?;
        info!(
            "History record {} for {} {}",
            saved.record.id,
            saved.record.function,
            if saved.updated { "updated" } else { "created" }
        );
        Ok(saved)
    }

    /// Patch the given fields of a record.
    pub async fn update(&self, id: HistoryId, patch: HistoryPatch) -> Result<HistoryRecord> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_or_default().await;

        let record = document
            .history
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(HistoryError::NotFound(id))?;
        if let Some(input) = patch.input {
            record.input = input;
        }
        if let Some(output) = patch.output {
            record.output = output;
        }
        if let Some(name) = patch.name {
            record.name = Some(name);
        }
        let updated = record.clone();

        self.repository.save(&document).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: HistoryId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_or_default().await;

        let index = document
            .history
            .iter()
            .position(|record| record.id == id)
            .ok_or(HistoryError::NotFound(id))?;
        document.history.remove(index);

        self.repository.save(&document).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistoryRepository;
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use serde_json::json;

    fn service(limit: usize) -> HistoryService {
        HistoryService::with_config(
            Arc::new(InMemoryHistoryRepository::new()),
            &StoreConfig {
                history_limit: limit,
                ..Default::default()
            },
        )
    }

    fn call(function: &str, marker: i64) -> Option<Value> {
        Some(json!({"sequence_num": marker, "function": function, "input_parameters": {}}))
    }

    #[tokio::test]
    async fn test_upsert_by_function_keeps_id_and_position() {
        let service = service(50);
        let first = service.save(call("GetMLE", 1), Some(json!("a"))).await.unwrap();
        service.save(call("SetGender", 2), None).await.unwrap();
        let second = service.save(call("GetMLE", 3), Some(json!("b"))).await.unwrap();

        assert!(!first.updated);
        assert!(second.updated);
        assert_eq!(second.record.id, first.record.id);

        let history = service.list().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].function, "SetGender");
        assert_eq!(history[1].function, "GetMLE");
        assert_eq!(history[1].output, json!("b"));
        assert_eq!(history[1].input["sequence_num"], json!(3));
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let service = service(50);
        let mut ids = Vec::new();
        for i in 0..5 {
            let saved = service.save(call(&format!("F{}", i), i), None).await.unwrap();
            ids.push(saved.record.id);
        }
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_limit_evicts_oldest() {
        let service = service(3);
        for i in 0..5 {
            service.save(call(&format!("F{}", i), i), None).await.unwrap();
        }
        let functions: Vec<_> = service.list().await.into_iter().map(|r| r.function).collect();
        assert_eq!(functions, vec!["F4", "F3", "F2"]);
    }

    #[tokio::test]
    async fn test_patch_and_delete() {
        let service = service(50);
        let saved = service.save(call("GetMLE", 1), None).await.unwrap();
        let id = saved.record.id;

        let patched = service
            .update(
                id,
                HistoryPatch {
                    name: Some("baseline".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.name.as_deref(), Some("baseline"));
        assert_eq!(patched.input, saved.record.input);

        service.delete(id).await.unwrap();
        assert!(matches!(
            service.delete(id).await,
            Err(HistoryError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            service.update(id, HistoryPatch::default()).await,
            Err(HistoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_current_params_defaults_to_empty_strings() {
        let service = service(50);
        let params = service.set_current_params(Some(json!("x")), None).await.unwrap();
        assert_eq!(params.output, json!(""));
        assert_eq!(service.current_params().await.input, json!("x"));
    }

    struct BrokenRepository;

    #[async_trait]
    impl HistoryRepository for BrokenRepository {
        async fn load(&self) -> Result<HistoryDocument> {
            Err(StorageError::Other("disk gone".to_string()).into())
        }

        async fn save(&self, _document: &HistoryDocument) -> Result<()> {
            Err(StorageError::Other("disk full".to_string()).into())
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_empty_and_write_failure_surfaces() {
        let service = HistoryService::new(Arc::new(BrokenRepository));
        assert!(service.list().await.is_empty());
        assert_eq!(service.current_params().await, CurrentParams::default());
        assert!(matches!(
            service.save(call("GetMLE", 1), None).await,
            Err(HistoryError::Persistence(_))
        ));
    }
}

//! Recorded call fixtures replayed by clients against a live engine.

use serde_json::Value;

use crate::storage::{Storage, StorageError, StorageResult};

/// Every `*.json` file directly under the storage root, parsed, in file name order.
pub async fn load_fixtures(storage: &dyn Storage) -> StorageResult<Vec<Value>> {
    let mut fixtures = Vec::new();
    for name in storage.list("").await? {
        if !name.ends_with(".json") {
            continue;
        }
        let content = storage.read(&name).await?;
        let fixture = serde_json::from_slice(&content).map_err(|e| StorageError::InvalidContent {
            path: name.clone(),
            message: e.to_string(),
        })?;
        fixtures.push(fixture);
    }
    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_json_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write("02_mle.json", br#"{"function": "GetMLE"}"#).await.unwrap();
        storage.write("01_version.json", br#"{"function": "dllVersion"}"#).await.unwrap();
        storage.write("notes.txt", b"skip me").await.unwrap();

        let fixtures = load_fixtures(&storage).await.unwrap();
        assert_eq!(
            fixtures,
            vec![json!({"function": "dllVersion"}), json!({"function": "GetMLE"})]
        );
    }

    #[tokio::test]
    async fn test_bad_fixture_is_reported() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write("bad.json", b"{").await.unwrap();

        assert!(matches!(
            load_fixtures(&storage).await,
            Err(StorageError::InvalidContent { .. })
        ));
    }
}

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Storage, StorageError, StorageResult};

/// Local filesystem storage implementation
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get full path by joining base path with relative path
    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(fs::try_exists(self.full_path(path)).await?)
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path);
        fs::read(&full_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(full_path.display().to_string()),
            _ => StorageError::IoError(e),
        })
    }

    async fn write(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        let full_path = self.full_path(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write beside the target, then swap it in
        let mut tmp_path = full_path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &full_path).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let full_path = self.full_path(prefix);

        if !full_path.exists() {
            return Err(StorageError::NotFound(full_path.display().to_string()));
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                entries.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(!storage.exists("nested/doc.json").await.unwrap());
        storage.write("nested/doc.json", b"{}").await.unwrap();
        assert!(storage.exists("nested/doc.json").await.unwrap());
        assert_eq!(storage.read("nested/doc.json").await.unwrap(), b"{}");

        storage.write("nested/doc.json", b"[1]").await.unwrap();
        assert_eq!(storage.read("nested/doc.json").await.unwrap(), b"[1]");
        assert_eq!(storage.list("nested").await.unwrap(), vec!["doc.json"]);
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_skips_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write("b.json", b"1").await.unwrap();
        storage.write("a.json", b"2").await.unwrap();
        storage.write("sub/c.json", b"3").await.unwrap();

        assert_eq!(storage.list("").await.unwrap(), vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_missing_paths() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(matches!(storage.read("nope").await, Err(StorageError::NotFound(_))));
        assert!(matches!(storage.list("nope").await, Err(StorageError::NotFound(_))));
    }
}

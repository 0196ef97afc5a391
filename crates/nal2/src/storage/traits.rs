use async_trait::async_trait;

use super::StorageResult;

/// Storage trait for the gateway's small on-disk documents
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check if a path exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Read file contents
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Replace file contents. Readers never observe a partially written file.
    async fn write(&self, path: &str, content: &[u8]) -> StorageResult<()>;

    /// List file names directly under a directory, sorted
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

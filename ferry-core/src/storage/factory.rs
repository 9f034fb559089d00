use super::{FileSlotStore, MemorySlotStore, RedisSlotStore, SlotStore};
use crate::{FerryError, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SlotStoreBuilder {
    backend: Option<String>,
    data_dir: Option<PathBuf>,
    redis_url: Option<String>,
    namespace: Option<String>,
}

impl SlotStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn resolve_backend(&self) -> Result<String> {
        let backend = self
            .backend
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if backend.is_empty() {
            return Err(FerryError::Config(
                "storage backend cannot be empty".to_string(),
            ));
        }

        Ok(backend)
    }

    pub async fn build(&self) -> Result<Arc<dyn SlotStore>> {
        let backend = self.resolve_backend()?;

        match backend.as_str() {
            "file" => {
                let data_dir = self
                    .data_dir
                    .clone()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .ok_or_else(|| {
                        FerryError::Config("data_dir is required for file backend".to_string())
                    })?;

                Ok(Arc::new(FileSlotStore::new(data_dir)?))
            }
            "memory" => Ok(Arc::new(MemorySlotStore::new())),
            "redis" => {
                let url = self.redis_url.as_deref().unwrap_or_default().trim();
                if url.is_empty() {
                    return Err(FerryError::Config(
                        "redis url is required for redis backend".to_string(),
                    ));
                }

                let namespace = self.namespace.as_deref().unwrap_or_default().trim();
                if namespace.is_empty() {
                    return Err(FerryError::Config(
                        "storage namespace cannot be empty for redis backend".to_string(),
                    ));
                }

                Ok(Arc::new(RedisSlotStore::new(url, namespace).await?))
            }
            other => Err(FerryError::Config(format!(
                "unsupported storage backend '{}': expected file | memory | redis",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotName;

    #[tokio::test]
    async fn test_build_file_backend() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SlotStoreBuilder::new()
            .backend(" File ")
            .data_dir(temp_dir.path())
            .build()
            .await
            .unwrap();

        assert_eq!(store.backend_name(), "file");
        store.write_slot(SlotName::RequestedFile, "x").await.unwrap();
        assert!(temp_dir.path().join("requestedFile.txt").exists());
    }

    #[tokio::test]
    async fn test_build_memory_backend() {
        let store = SlotStoreBuilder::new().backend("memory").build().await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_build_rejects_bad_config() {
        let missing_backend = SlotStoreBuilder::new().build().await;
        assert!(matches!(missing_backend, Err(FerryError::Config(_))));

        let missing_dir = SlotStoreBuilder::new().backend("file").build().await;
        assert!(matches!(missing_dir, Err(FerryError::Config(_))));

        let missing_url = SlotStoreBuilder::new()
            .backend("redis")
            .namespace("ferry")
            .build()
            .await;
        assert!(matches!(missing_url, Err(FerryError::Config(_))));

        let unknown = SlotStoreBuilder::new().backend("sqlite").build().await;
        assert!(matches!(unknown, Err(FerryError::Config(_))));
    }
}

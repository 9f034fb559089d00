use super::{SlotName, SlotStore};
use crate::error::{FerryError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

/// FileSlotStore keeps one file per slot under a data directory
pub struct FileSlotStore {
    base_path: PathBuf,
}

impl FileSlotStore {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the base path for the store
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn slot_path(&self, slot: SlotName) -> PathBuf {
        self.base_path.join(slot.key())
    }

    // Unique per write so two writers never share a temp file.
    fn temp_path(&self, slot: SlotName) -> PathBuf {
        self.base_path.join(format!(".{}.{}.tmp", slot.key(), Ulid::new()))
    }

    async fn replace(&self, slot: SlotName, temp_path: &PathBuf, value: &str) -> Result<()> {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp_path, self.slot_path(slot)).await?;
        Ok(())
    }
}

#[async_trait]
impl SlotStore for FileSlotStore {
    async fn read_slot(&self, slot: SlotName) -> Result<Option<String>> {
        let bytes = match fs::read(self.slot_path(slot)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        String::from_utf8(bytes).map(Some).map_err(|e| {
            FerryError::Storage(format!("slot {} is not valid UTF-8: {}", slot, e))
        })
    }

    async fn write_slot(&self, slot: SlotName, value: &str) -> Result<()> {
        // Write to temporary file first, then rename for atomicity
        let temp_path = self.temp_path(slot);

        if let Err(e) = self.replace(slot, &temp_path, value).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        tracing::debug!("Stored slot {} ({} bytes)", slot, value.len());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

//! Transfer handshake
//!
//! Two independent single-value channels: a client deposits a filename in
//! the request slot, a server reads it and deposits content in the content
//! slot, and the client polls for that content. Reads never consume a value.
//! There is one request slot for the whole process, so a second request
//! overwrites the first.

use crate::storage::{SlotName, SlotStore};
use crate::{FerryError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Upper bound on uploaded content, in encoded bytes.
pub const MAX_CONTENT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequestAck {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitContentAck {
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(String),
    NotFound,
}

impl FetchOutcome {
    pub fn into_option(self) -> Option<String> {
        match self {
            FetchOutcome::Found(value) => Some(value),
            FetchOutcome::NotFound => None,
        }
    }
}

impl From<Option<String>> for FetchOutcome {
    fn from(value: Option<String>) -> Self {
        value.map_or(FetchOutcome::NotFound, FetchOutcome::Found)
    }
}

pub struct TransferHandshake {
    store: Arc<dyn SlotStore>,
    request_lock: Mutex<()>,
    content_lock: Mutex<()>,
}

impl TransferHandshake {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self {
            store,
            request_lock: Mutex::new(()),
            content_lock: Mutex::new(()),
        }
    }

    pub async fn submit_request(&self, file_name: &str) -> Result<SubmitRequestAck> {
        validate_file_name(file_name)?;

        let _guard = self.request_lock.lock().await;
        self.store
            .write_slot(SlotName::RequestedFile, file_name)
            .await?;

        tracing::info!("Client requested file {}", file_name);
        Ok(SubmitRequestAck {
            file_name: file_name.to_string(),
        })
    }

    pub async fn fetch_request(&self) -> Result<FetchOutcome> {
        let value = self.store.read_slot(SlotName::RequestedFile).await?;
        Ok(value.into())
    }

    pub async fn submit_content(&self, content: &str) -> Result<SubmitContentAck> {
        let size = content.len();
        if size > MAX_CONTENT_BYTES {
            return Err(FerryError::PayloadTooLarge {
                size,
                limit: MAX_CONTENT_BYTES,
            });
        }

        let _guard = self.content_lock.lock().await;
        self.store.write_slot(SlotName::FileContent, content).await?;

        tracing::info!("Server uploaded {} bytes of content", size);
        Ok(SubmitContentAck { size })
    }

    pub async fn fetch_content(&self) -> Result<FetchOutcome> {
        let value = self.store.read_slot(SlotName::FileContent).await?;
        Ok(value.into())
    }
}

fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(FerryError::InvalidInput(
            "file name cannot be empty".to_string(),
        ));
    }

    if file_name.contains(['/', '\\']) {
        return Err(FerryError::InvalidInput(format!(
            "file name must not contain path separators: {}",
            file_name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileSlotStore, MemorySlotStore};

    fn memory_handshake() -> TransferHandshake {
        TransferHandshake::new(Arc::new(MemorySlotStore::new()))
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let handshake = memory_handshake();
        assert_eq!(
            handshake.fetch_request().await.unwrap(),
            FetchOutcome::NotFound
        );

        let ack = handshake.submit_request("foo.txt").await.unwrap();
        assert_eq!(ack.file_name, "foo.txt");

        assert_eq!(
            handshake.fetch_request().await.unwrap(),
            FetchOutcome::Found("foo.txt".to_string())
        );
        // Polling does not consume the request
        assert_eq!(
            handshake.fetch_request().await.unwrap(),
            FetchOutcome::Found("foo.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_second_request_overwrites_first() {
        let handshake = memory_handshake();
        handshake.submit_request("first.txt").await.unwrap();
        handshake.submit_request("second.txt").await.unwrap();

        assert_eq!(
            handshake.fetch_request().await.unwrap().into_option(),
            Some("second.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_request_rejects_path_separators() {
        let handshake = memory_handshake();
        handshake.submit_request("keep.txt").await.unwrap();

        for bad in ["a/b", "a\\b", "", "   ", "/etc/passwd"] {
            let err = handshake.submit_request(bad).await.unwrap_err();
            assert!(matches!(err, FerryError::InvalidInput(_)), "{:?}", bad);
        }

        assert_eq!(
            handshake.fetch_request().await.unwrap(),
            FetchOutcome::Found("keep.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_content_round_trip() {
        let handshake = memory_handshake();
        assert_eq!(
            handshake.fetch_content().await.unwrap(),
            FetchOutcome::NotFound
        );

        let body = "fn main() {\n    println!(\"héllo\");\n}\n";
        let ack = handshake.submit_content(body).await.unwrap();
        assert_eq!(ack.size, body.len());

        assert_eq!(
            handshake.fetch_content().await.unwrap(),
            FetchOutcome::Found(body.to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_content_is_stored() {
        let handshake = memory_handshake();
        handshake.submit_content("").await.unwrap();

        assert_eq!(
            handshake.fetch_content().await.unwrap(),
            FetchOutcome::Found(String::new())
        );
    }

    #[tokio::test]
    async fn test_content_size_limit_counts_bytes() {
        let handshake = memory_handshake();
        handshake.submit_content("previous").await.unwrap();

        let at_limit = "a".repeat(MAX_CONTENT_BYTES);
        handshake.submit_content(&at_limit).await.unwrap();
        assert_eq!(
            handshake.fetch_content().await.unwrap().into_option().map(|c| c.len()),
            Some(MAX_CONTENT_BYTES)
        );

        handshake.submit_content("previous").await.unwrap();

        // Half as many characters as the limit, but each one takes two bytes.
        let multibyte = "é".repeat(MAX_CONTENT_BYTES / 2 + 1);
        assert!(multibyte.chars().count() < MAX_CONTENT_BYTES);

        let err = handshake.submit_content(&multibyte).await.unwrap_err();
        match err {
            FerryError::PayloadTooLarge { size, limit } => {
                assert_eq!(size, MAX_CONTENT_BYTES + 2);
                assert_eq!(limit, MAX_CONTENT_BYTES);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(
            handshake.fetch_content().await.unwrap(),
            FetchOutcome::Found("previous".to_string())
        );
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let handshake = memory_handshake();

        // Content may arrive before any request
        handshake.submit_content("early").await.unwrap();
        assert_eq!(
            handshake.fetch_request().await.unwrap(),
            FetchOutcome::NotFound
        );

        handshake.submit_request("later.txt").await.unwrap();
        assert_eq!(
            handshake.fetch_content().await.unwrap(),
            FetchOutcome::Found("early".to_string())
        );
    }

    #[tokio::test]
    async fn test_handshake_survives_restart() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let store = Arc::new(FileSlotStore::new(temp_dir.path().to_path_buf()).unwrap());
            let handshake = TransferHandshake::new(store);
            handshake.submit_request("report.csv").await.unwrap();
            handshake.submit_content("a,b\n1,2\n").await.unwrap();
        }

        let store = Arc::new(FileSlotStore::new(temp_dir.path().to_path_buf()).unwrap());
        let handshake = TransferHandshake::new(store);
        assert_eq!(
            handshake.fetch_request().await.unwrap(),
            FetchOutcome::Found("report.csv".to_string())
        );
        assert_eq!(
            handshake.fetch_content().await.unwrap(),
            FetchOutcome::Found("a,b\n1,2\n".to_string())
        );
    }
}

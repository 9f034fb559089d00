//! Online address registry
//!
//! The set is persisted in the `onlineAddrs` slot as one address per line.
//! Listing order is first-insertion order.

use crate::storage::{SlotName, SlotStore};
use crate::{FerryError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

impl AddOutcome {
    pub fn added(&self) -> bool {
        matches!(self, AddOutcome::Added)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

pub struct AddressRegistry {
    store: Arc<dyn SlotStore>,
    // Held across load-modify-persist of the address slot.
    write_lock: Mutex<()>,
}

impl AddressRegistry {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn add(&self, addr: &str) -> Result<AddOutcome> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(FerryError::InvalidInput(
                "address cannot be empty".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut addrs = self.load().await?;

        if addrs.iter().any(|existing| existing == addr) {
            tracing::debug!("Address {} already online", addr);
            return Ok(AddOutcome::AlreadyPresent);
        }

        addrs.push(addr.to_string());
        self.persist(&addrs).await?;

        tracing::info!("Address {} is online ({} total)", addr, addrs.len());
        Ok(AddOutcome::Added)
    }

    pub async fn remove(&self, addr: &str) -> Result<RemoveOutcome> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Ok(RemoveOutcome::NotFound);
        }

        let _guard = self.write_lock.lock().await;
        let mut addrs = self.load().await?;

        let before = addrs.len();
        addrs.retain(|existing| existing != addr);
        if addrs.len() == before {
            return Ok(RemoveOutcome::NotFound);
        }

        self.persist(&addrs).await?;

        tracing::info!("Address {} went offline ({} remaining)", addr, addrs.len());
        Ok(RemoveOutcome::Removed)
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(&[]).await?;

        tracing::info!("Cleared online address index");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.load().await
    }

    async fn load(&self) -> Result<Vec<String>> {
        let raw = self.store.read_slot(SlotName::OnlineAddrs).await?;
        Ok(raw.as_deref().map(parse_addrs).unwrap_or_default())
    }

    async fn persist(&self, addrs: &[String]) -> Result<()> {
        self.store
            .write_slot(SlotName::OnlineAddrs, &encode_addrs(addrs))
            .await
    }
}

/// Parse the stored list, dropping blank lines and later duplicates.
fn parse_addrs(raw: &str) -> Vec<String> {
    let mut addrs: Vec<String> = Vec::new();
    for line in raw.lines() {
        let addr = line.trim();
        if addr.is_empty() || addrs.iter().any(|existing| existing == addr) {
            continue;
        }
        addrs.push(addr.to_string());
    }
    addrs
}

fn encode_addrs(addrs: &[String]) -> String {
    addrs.iter().map(|addr| format!("{}\n", addr)).collect()
}

use super::{SlotName, SlotStore};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process slot store. Nothing survives a restart.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<SlotName, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn read_slot(&self, slot: SlotName) -> Result<Option<String>> {
        Ok(self.slots.read().await.get(&slot).cloned())
    }

    async fn write_slot(&self, slot: SlotName, value: &str) -> Result<()> {
        self.slots.write().await.insert(slot, value.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

//! Storage modules for Ferry
//!
//! Every piece of shared state lives in a named slot holding exactly one
//! value. Backends must replace a slot atomically so readers never see a
//! partially written value.

pub mod factory;
pub mod file_store;
pub mod memory_store;
pub mod redis_store;

pub use factory::SlotStoreBuilder;
pub use file_store::FileSlotStore;
pub use memory_store::MemorySlotStore;
pub use redis_store::RedisSlotStore;

use crate::Result;
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    OnlineAddrs,
    RequestedFile,
    FileContent,
}

impl SlotName {
    pub const ALL: [SlotName; 3] = [
        SlotName::OnlineAddrs,
        SlotName::RequestedFile,
        SlotName::FileContent,
    ];

    /// Fixed storage key of the slot. Also the file name used by the file backend.
    pub fn key(&self) -> &'static str {
        match self {
            SlotName::OnlineAddrs => "onlineAddrs",
            SlotName::RequestedFile => "requestedFile.txt",
            SlotName::FileContent => "fileContent.txt",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Read the current value of a slot, `None` if it was never written.
    async fn read_slot(&self, slot: SlotName) -> Result<Option<String>>;

    /// Atomically replace the value of a slot.
    async fn write_slot(&self, slot: SlotName, value: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

use super::{SlotName, SlotStore};
use crate::error::{FerryError, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Slot store backed by one redis string key per slot.
///
/// `SET` replaces the whole value in one step, which gives the same
/// all-or-nothing visibility as the file backend's rename.
pub struct RedisSlotStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisSlotStore {
    pub async fn new(url: &str, namespace: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|error| {
            FerryError::Config(format!("redis connection config error: {}", error))
        })?;

        let conn = ConnectionManager::new(client).await?;

        tracing::info!("Connected to redis slot store (namespace {})", namespace);

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }
}

fn slot_key(namespace: &str, slot: SlotName) -> String {
    format!("{}:slot:{}", namespace, slot.key())
}

#[async_trait]
impl SlotStore for RedisSlotStore {
    async fn read_slot(&self, slot: SlotName) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(slot_key(&self.namespace, slot)).await?;
        Ok(value)
    }

    async fn write_slot(&self, slot: SlotName, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(slot_key(&self.namespace, slot), value).await?;

        tracing::debug!("Stored slot {} in redis ({} bytes)", slot, value.len());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

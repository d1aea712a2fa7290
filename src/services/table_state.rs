use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::table::{TableQueryState, TableStateSnapshot};
use crate::models::workflow::TableId;

const KEY_PREFIX: &str = "sewer_batch:table_state:";

/// Snapshots expire after 30 days without a visit.
const SNAPSHOT_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Persists pagination snapshots by string key. Writes replace the whole value.
#[async_trait]
pub trait TableStateStore: Send + Sync {
    async fn save(&self, key: &str, snapshot: &TableStateSnapshot) -> Result<(), StoreError>;

    async fn load(&self, key: &str) -> Result<Option<TableStateSnapshot>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Redis-backed store shared by every API replica.
pub struct RedisTableStateStore {
    client: redis::Client,
}

impl RedisTableStateStore {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl TableStateStore for RedisTableStateStore {
    async fn save(&self, key: &str, snapshot: &TableStateSnapshot) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(snapshot)?;
        conn.set_ex::<_, _, ()>(Self::key(key), payload, SNAPSHOT_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<TableStateSnapshot>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::key(key)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// Process-local store used when no Redis URL is configured, and in tests.
#[derive(Default)]
pub struct MemoryTableStateStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTableStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStateStore for MemoryTableStateStore {
    async fn save(&self, key: &str, snapshot: &TableStateSnapshot) -> Result<(), StoreError> {
        let payload = serde_json::to_string(snapshot)?;
        self.entries.write().await.insert(key.to_string(), payload);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<TableStateSnapshot>, StoreError> {
        match self.entries.read().await.get(key) {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Fresh table state for `table`, restored from the user's snapshot if any.
pub async fn load_table_state(
    store: &dyn TableStateStore,
    user: &str,
    table: TableId,
) -> Result<TableQueryState, StoreError> {
    let mut state = TableQueryState::default();
    if let Some(snapshot) = store.load(&table.store_key(user)).await? {
        state.restore(&snapshot);
    }
    Ok(state)
}

pub async fn persist_table_state(
    store: &dyn TableStateStore,
    user: &str,
    table: TableId,
    state: &TableQueryState,
) -> Result<(), StoreError> {
    let key = table.store_key(user);
    store.save(&key, &state.snapshot()).await?;
    debug!(key = %key, page = state.page, size = state.page_size, "Persisted table state");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::BotConfig;

const KEY_PREFIX: &str = "memory:";

fn memory_key(sender: &str) -> String {
    format!("{}{}", KEY_PREFIX, sender)
}

/// Short-term conversational memory, one transcript per sender.
///
/// Entries expire after the configured TTL; an expired entry reads as
/// absent, which is how conversations go quiet.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self, sender: &str) -> Result<Option<String>>;
    async fn set(&self, sender: &str, transcript: &str, ttl_secs: u64) -> Result<()>;
}

/// Build the store the config names: redis when a URL is set, in-process otherwise.
pub async fn connect_store(config: &BotConfig) -> Result<Arc<dyn MemoryStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisMemoryStore::connect(url).await?;
            tracing::info!("Short-term memory backed by redis at {}", url);
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("Short-term memory is process-local (no redis_url configured)");
            Ok(Arc::new(LocalMemoryStore::new()))
        }
    }
}

/// Redis-backed memory with server-side expiry.
pub struct RedisMemoryStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisMemoryStore {
    /// Connect and verify the server answers before any turn depends on it
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid redis URL")?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .with_context(|| format!("Failed to connect to redis at {}", url))?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis ping failed")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl MemoryStore for RedisMemoryStore {
    async fn get(&self, sender: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(memory_key(sender))
            .await
            .context("Failed to read conversation memory")?;
        Ok(value)
    }

    async fn set(&self, sender: &str, transcript: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(memory_key(sender), transcript, ttl_secs)
            .await
            .context("Failed to write conversation memory")?;
        Ok(())
    }
}

/// In-process memory used when no redis URL is configured, and in tests.
pub struct LocalMemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl LocalMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock_entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store lock poisoned: {}", e))
    }
}

impl Default for LocalMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for LocalMemoryStore {
    async fn get(&self, sender: &str) -> Result<Option<String>> {
        let mut entries = self.lock_entries()?;
        let key = memory_key(sender);
        match entries.get(&key) {
            Some((_, expiry)) if Instant::now() >= *expiry => {
                entries.remove(&key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, sender: &str, transcript: &str, ttl_secs: u64) -> Result<()> {
        let expiry = Instant::now() + Duration::from_secs(ttl_secs);
        self.lock_entries()?
            .insert(memory_key(sender), (transcript.to_string(), expiry));
        Ok(())
    }
}

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::world::WorldStore;

/// Maps external sender ids to internal bot ids, creating bots on first contact.
///
/// The cache never evicts; the store remains the source of truth when the
/// cache is cold.
pub struct BotRegistry {
    store: Arc<WorldStore>,
    cache: Mutex<HashMap<String, i64>>,
}

impl BotRegistry {
    pub fn new(store: Arc<WorldStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a sender to its bot id, creating the bot on first contact.
    ///
    /// The cache lock is held across the store lookup so concurrent first
    /// contacts from one sender cannot create two bots.
    pub async fn resolve(&self, sender: &str) -> Result<i64> {
        let mut cache = self.cache.lock().await;
        if let Some(&id) = cache.get(sender) {
            return Ok(id);
        }

        let name = format!("bot_{}", sender);
        let id = match self.store.find_bot_by_name(&name)? {
            Some(id) => id,
            None => {
                let id = self.store.create_bot(&name)?;
                tracing::info!("Created bot {} ({}) for sender {}", id, name, sender);
                id
            }
        };
        cache.insert(sender.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Arc<WorldStore>) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = WorldStore::open(dir.path().join("world.db")).expect("open store");
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let (_dir, store) = temp_store();
        let registry = BotRegistry::new(store.clone());

        let first = registry.resolve("42").await.expect("resolve");
        let second = registry.resolve("42").await.expect("resolve");
        assert_eq!(first, second);
        assert_eq!(store.all_bot_ids().expect("ids").len(), 1);
    }

    #[tokio::test]
    async fn distinct_senders_get_distinct_bots() {
        let (_dir, store) = temp_store();
        let registry = BotRegistry::new(store.clone());

        let a = registry.resolve("1").await.expect("resolve");
        let b = registry.resolve("2").await.expect("resolve");
        assert_ne!(a, b);

        let bot = store.get_bot(a).expect("get").expect("row");
        assert_eq!(bot.name, "bot_1");
    }

    #[tokio::test]
    async fn cold_cache_finds_the_existing_row() {
        let (_dir, store) = temp_store();
        let existing = store.create_bot("bot_42").expect("create");

        let registry = BotRegistry::new(store.clone());
        assert_eq!(registry.resolve("42").await.expect("resolve"), existing);
        assert_eq!(store.all_bot_ids().expect("ids").len(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_bot() {
        let (_dir, store) = temp_store();
        let registry = Arc::new(BotRegistry::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(
                async move { registry.resolve("42").await.expect("resolve") },
            ));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("join"));
        }
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(store.all_bot_ids().expect("ids").len(), 1);
    }

    #[tokio::test]
    async fn anonymous_is_a_sender_like_any_other() {
        let (_dir, store) = temp_store();
        let registry = BotRegistry::new(store.clone());

        let id = registry.resolve("anonymous").await.expect("resolve");
        let bot = store.get_bot(id).expect("get").expect("row");
        assert_eq!(bot.name, "bot_anonymous");
    }
}

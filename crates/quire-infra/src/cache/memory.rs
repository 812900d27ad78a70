//! In-memory cache - used when Redis is not configured and in tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use quire_core::ports::{Cache, CacheError, CacheKey};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Process-local cache keyed by [`CacheKey`]. Data is lost on restart.
pub struct InMemoryCache {
    store: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.values().filter(|entry| !entry.is_expired()).count()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if entry.is_expired() {
            drop(store);
            self.store.write().await.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        store.insert(
            *key,
            CacheEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &CacheKey) -> Result<u64, CacheError> {
        let mut store = self.store.write().await;
        let current = match store.get(key) {
            Some(entry) if !entry.is_expired() => entry
                .value
                .parse::<u64>()
                .map_err(|e| CacheError::Operation(format!("{key} is not a counter: {e}")))?,
            _ => 0,
        };
        let next = current + 1;
        store.insert(
            *key,
            CacheEntry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }
}

//! Redis cache, shared by every server instance so comment counts stay
//! coherent across the fleet.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use quire_core::ports::{Cache, CacheError, CacheKey};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connect_timeout: std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }
}

/// Redis-backed cache using a reconnecting connection manager.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key.to_string()).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = key.to_string();

        match ttl {
            Some(duration) => conn
                .set_ex::<_, _, ()>(key, value, duration.as_secs().max(1))
                .await
                .map_err(|e| CacheError::Operation(e.to_string())),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| CacheError::Operation(e.to_string())),
        }
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key.to_string())
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn incr(&self, key: &CacheKey) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, u64>(key.to_string(), 1u64)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }
}

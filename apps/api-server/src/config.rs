//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use quire_core::services::DEFAULT_COUNT_TTL;
use quire_infra::JwtConfig;

/// Where derived values such as comment counts are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

/// Database settings. Absent when `DATABASE_URL` is unset.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseSettings>,
    pub cache: CacheBackend,
    /// How long a cached comment count may live. `None` keeps it until
    /// invalidated.
    pub comment_count_ttl: Option<Duration>,
    pub jwt: JwtConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseSettings {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(20),
            min_connections: parse_var("DB_MIN_CONNECTIONS").unwrap_or(2),
        });

        let cache = env::var("CACHE_BACKEND")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(backend) => Some(backend),
                Err(e) => {
                    tracing::warn!(error = %e, "Falling back to in-memory cache");
                    None
                }
            })
            .unwrap_or_default();

        let comment_count_ttl = match parse_var::<u64>("COMMENT_COUNT_TTL_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_COUNT_TTL),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database,
            cache,
            comment_count_ttl,
            jwt: JwtConfig::from_env(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

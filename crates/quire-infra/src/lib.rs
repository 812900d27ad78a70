//! # Quire Infrastructure
//!
//! Concrete implementations of the ports defined in `quire-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory store and cache only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `redis` - Redis-backed cache

pub mod cache;
pub mod database;
pub mod markdown;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::InMemoryStore;
pub use markdown::PulldownMarkdown;

#[cfg(feature = "postgres")]
pub use database::DatabaseConnections;

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

/// Everything the services keep in a cache. Keys are rendered to strings
/// only at the backend boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Approved comments on a post, replies included.
    ApprovedCommentCount(Uuid),
    /// Bumped on every change to a post's approved comments. A cached count
    /// is only trusted when it was computed under the current generation.
    CountGeneration(Uuid),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ApprovedCommentCount(post_id) => {
                write!(f, "quire:post:{post_id}:approved_comments")
            }
            CacheKey::CountGeneration(post_id) => {
                write!(f, "quire:post:{post_id}:approved_comments:gen")
            }
        }
    }
}

/// Cache trait - abstraction over caching backends (Redis, in-memory).
///
/// Cached values are derived data; a miss must always be recoverable from
/// the store.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value, `None` on miss or backend failure.
    async fn get(&self, key: &CacheKey) -> Option<String>;

    /// Set a value with optional TTL.
    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Drop a value so the next read recomputes it.
    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Atomically add one to an integer value, starting from zero, and
    /// return the new value. Counters never expire.
    async fn incr(&self, key: &CacheKey) -> Result<u64, CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rendering_is_stable() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::ApprovedCommentCount(id).to_string(),
            "quire:post:00000000-0000-0000-0000-000000000000:approved_comments"
        );
        assert_eq!(
            CacheKey::CountGeneration(id).to_string(),
            "quire:post:00000000-0000-0000-0000-000000000000:approved_comments:gen"
        );
    }
}

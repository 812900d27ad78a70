//! Domain-level error types.

use thiserror::Error;

/// Domain errors - business logic failures.
///
/// None of these are retried by the core; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} {key}")]
    NotFound { entity_type: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The actor is known but not allowed to perform the action
    /// (not the owner, edit window elapsed, post not published).
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// No actor was supplied for an action that requires one.
    #[error("Authentication required")]
    Unauthenticated,

    /// The request contradicts stored relationships, e.g. replying to a
    /// comment while claiming a different post.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            key: key.to_string(),
        }
    }

    /// Both authorization flavours: unknown actor and forbidden actor.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Unauthenticated)
    }
}

/// Result alias for service operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Constraint(msg) => DomainError::Duplicate(msg),
            RepoError::NotFound => DomainError::Internal("record vanished during write".to_string()),
            RepoError::Connection(msg) | RepoError::Query(msg) => DomainError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_constraint_becomes_duplicate() {
        let err: DomainError = RepoError::Constraint("slug taken".into()).into();
        assert!(matches!(err, DomainError::Duplicate(msg) if msg == "slug taken"));
    }

    #[test]
    fn test_authorization_kinds() {
        assert!(DomainError::Unauthenticated.is_authorization());
        assert!(DomainError::Unauthorized("nope".into()).is_authorization());
        assert!(!DomainError::Validation("short".into()).is_authorization());
    }
}

//! Identity ports. The core only ever consumes the actor id these produce.

use uuid::Uuid;

use crate::domain::User;

/// Claims carried by an access token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub exp: i64,
}

/// Issues and checks bearer tokens.
pub trait TokenService: Send + Sync {
    /// Issue an access token for `user`.
    fn issue(&self, user: &User) -> Result<String, AuthError>;

    /// Validate and decode a token.
    fn validate(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Lifetime of issued tokens.
    fn expiration_seconds(&self) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Hashing error: {0}")]
    HashingError(String),
}

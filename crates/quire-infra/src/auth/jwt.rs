//! JWT token service implementation.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quire_core::domain::User;
use quire_core::ports::{AuthError, TokenClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            expiration_hours: 24,
            issuer: "quire-api".to_string(),
        }
    }
}

impl JwtConfig {
    /// Load configuration from `JWT_SECRET`, `JWT_EXPIRATION_HOURS` and `JWT_ISSUER`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secret = std::env::var("JWT_SECRET").unwrap_or(defaults.secret);

        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }

        Self {
            secret,
            expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.expiration_hours),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    email: String,
    exp: i64,
    iat: i64,
    iss: String,
}

/// HS256 bearer tokens carrying the user's id, name and email.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + TimeDelta::hours(self.config.expiration_hours);

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(TokenClaims {
            user_id,
            name: data.claims.name,
            email: data.claims.email,
            exp: data.claims.exp,
        })
    }

    fn expiration_seconds(&self) -> i64 {
        self.config.expiration_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            expiration_hours: 1,
            issuer: issuer.to_string(),
        }
    }

    fn test_user() -> User {
        User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        )
    }

    #[test]
    fn test_issue_and_validate() {
        let service = JwtTokenService::new(test_config("test-issuer"));
        let user = test_user();

        let token = service.issue(&user).unwrap();
        assert!(!token.is_empty());

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_validate_invalid_token() {
        let service = JwtTokenService::new(test_config("test-issuer"));

        let result = service.validate("invalid-token");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_validate_wrong_issuer_token() {
        let issuer1 = JwtTokenService::new(test_config("issuer1"));
        let issuer2 = JwtTokenService::new(test_config("issuer2"));

        let token = issuer1.issue(&test_user()).unwrap();
        assert!(issuer2.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: -2,
            ..test_config("test-issuer")
        });

        let token = service.issue(&test_user()).unwrap();
        assert!(matches!(service.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_expiration_seconds() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: 24,
            ..test_config("test")
        });

        assert_eq!(service.expiration_seconds(), 86400);
    }
}

//! Argon2 password hashing implementation.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use quire_core::ports::{AuthError, PasswordService};

/// Argon2id password hashing with a random salt per hash.
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::HashingError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| AuthError::HashingError(e.to_string()))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = Argon2PasswordService::new();
        let password = "correct horse battery staple";

        let hash = service.hash(password).unwrap();
        assert_ne!(hash, password);
        assert!(service.verify(password, &hash).unwrap());
        assert!(!service.verify("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let service = Argon2PasswordService::new();
        let first = service.hash("secret123").unwrap();
        let second = service.hash("secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let service = Argon2PasswordService::new();
        assert!(matches!(
            service.verify("secret123", "not-a-phc-string"),
            Err(AuthError::HashingError(_))
        ));
    }
}

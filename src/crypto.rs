//! Password hashing.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;
use crate::error::ServerError;

type Result<T> = std::result::Result<T, ServerError>;

/// Argon2id password manager.
pub struct Crypto {
    argon2: Argon2<'static>,
}

impl Crypto {
    /// Create a new [`Crypto`] with optional tuning from `config.yaml`.
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|err| ServerError::Internal(err.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string for storage.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| ServerError::Internal(err.to_string()))
    }

    /// Check a password against a stored PHC string.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

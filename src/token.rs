//! Manage recruiter json web tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Recruiter tokens are time-boxed to 30 days.
pub const EXPIRATION_TIME: u64 = 60 * 60 * 24 * 30;

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time on or after which the JWT must not
    /// be accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Company ID.
    pub sub: String,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenManager {
    /// Create a new [`TokenManager`] signing with a shared secret.
    pub fn new(issuer: &str, secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_owned(),
        }
    }

    /// Create a new signed token for a company.
    pub fn create(&self, company_id: &str) -> Result<String> {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ServerError::Internal(err.to_string()))?
            .as_secs();
        let claims = Claims {
            exp: time + EXPIRATION_TIME,
            iat: time,
            iss: self.issuer.clone(),
            sub: company_id.to_owned(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| ServerError::Internal(err.to_string()))
    }

    /// Decode and check a token. Signature or expiry failures both read
    /// as an invalid token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ServerError::Unauthorized("Invalid token.".into()))
    }
}

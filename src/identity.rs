//! Delegated applicant identity verification.
//!
//! Applicants authenticate against an external identity provider; this
//! module only verifies the bearer token the provider issued and
//! extracts its opaque subject id. Profile records are created through
//! the explicit sync endpoint, never here.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::config::Identity as IdentityConfig;
use crate::error::{Result, ServerError};

/// Claims asserted by the identity provider. Only the subject is used.
#[derive(Debug, Deserialize)]
pub struct ProviderClaims {
    pub sub: String,
    #[allow(dead_code)]
    pub exp: u64,
}

#[derive(Clone)]
struct Verifier {
    key: DecodingKey,
    validation: Validation,
}

/// Verifies provider-issued bearer tokens. When no key material is
/// configured every verification fails with `Unauthorized`.
#[derive(Clone, Default)]
pub struct IdentityProvider {
    verifier: Option<Verifier>,
}

impl IdentityProvider {
    /// Build a provider from configured key material.
    pub fn new(
        config: &IdentityConfig,
    ) -> std::result::Result<Self, jsonwebtoken::errors::Error> {
        let (key, algorithm) = if let Some(pem) = &config.public_key_pem {
            (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256)
        } else if let Some(secret) = &config.secret {
            (
                DecodingKey::from_secret(secret.as_bytes()),
                Algorithm::HS256,
            )
        } else {
            return Ok(Self::default());
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            verifier: Some(Verifier { key, validation }),
        })
    }

    /// Verify a bearer token and return the provider subject id.
    pub fn verify(&self, token: &str) -> Result<String> {
        let Some(verifier) = &self.verifier else {
            return Err(ServerError::Unauthorized(
                "Identity provider is not configured.".into(),
            ));
        };

        decode::<ProviderClaims>(token, &verifier.key, &verifier.validation)
            .map(|data| data.claims.sub)
            .map_err(|_| ServerError::Unauthorized("Invalid token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: u64,
    }

    fn provider(secret: &str) -> IdentityProvider {
        IdentityProvider::new(&IdentityConfig {
            secret: Some(secret.into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn mint(secret: &str, sub: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        encode(
            &Header::new(Algorithm::HS256),
            &TestClaims {
                sub: sub.into(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn extracts_subject() {
        let provider = provider("provider-secret");
        let token = mint("provider-secret", "subject_1");
        assert_eq!(provider.verify(&token).unwrap(), "subject_1");
    }

    #[test]
    fn unconfigured_provider_rejects_everything() {
        let provider = IdentityProvider::default();
        assert!(provider.verify("anything").is_err());
    }

    #[test]
    fn rejects_foreign_signature() {
        let provider = provider("provider-secret");
        let token = mint("other-secret", "subject_1");
        assert!(provider.verify(&token).is_err());
    }
}

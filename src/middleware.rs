//! Request guards for the two principal types.
//!
//! Recruiters present a locally signed token in the `token` header;
//! applicants present the identity provider's bearer token in the
//! `Authorization` header. The two namespaces are disjoint: neither
//! credential satisfies the other guard.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::AppState;
use crate::error::ServerError;
use crate::model::{Company, User};

const TOKEN_HEADER: &str = "token";
const BEARER_PREFIX: &str = "Bearer ";

/// Recruiter resolved from the `token` header.
pub struct AuthCompany(pub Company);

/// Applicant profile resolved from the bearer token.
pub struct AuthUser(pub User);

/// Verified identity-provider subject, without requiring a profile.
/// Only the sync and conflict-resolution endpoints use this.
pub struct AuthSubject(pub String);

impl FromRequestParts<AppState> for AuthCompany {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ServerError::Unauthorized(
                    "Access denied. No token provided.".into(),
                )
            })?;

        let claims = state.token.decode(token)?;
        let company = state
            .store
            .company_by_id(&claims.sub)
            .await?
            .ok_or_else(|| {
                ServerError::Unauthorized("Company not found.".into())
            })?;

        if !state.config.email_allowed(&company.email) {
            return Err(ServerError::Forbidden(
                "Your company is not authorized to perform this action."
                    .into(),
            ));
        }

        Ok(Self(company))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ServerError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| ServerError::Unauthorized("No token provided".into()))
}

impl FromRequestParts<AppState> for AuthSubject {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        Ok(Self(state.identity.verify(token)?))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSubject(subject) =
            AuthSubject::from_request_parts(parts, state).await?;

        let user = state
            .store
            .user_by_subject(&subject)
            .await?
            .ok_or_else(|| {
                ServerError::NotFound(
                    "User profile not found. Please complete your profile setup."
                        .into(),
                )
            })?;

        Ok(Self(user))
    }
}

//! HTTP route handlers.

pub mod company;
pub mod jobs;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppState;
use crate::error::ServerError;

/// JSON body extractor that also runs `validator` checks.
pub struct Valid<T>(pub T);

impl<T> FromRequest<AppState> for Valid<T>
where
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        body.validate()?;
        Ok(Self(body))
    }
}

/// Resolve a stored resume reference into a link the client can open.
/// Absolute URLs pass through, everything else is served from
/// `/uploads`.
pub(crate) fn resume_link(reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(reference.to_owned());
    }
    if reference.starts_with("/uploads/") {
        return Some(reference.to_owned());
    }
    Some(format!("/uploads/{reference}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_links() {
        assert_eq!(resume_link(""), None);
        assert_eq!(
            resume_link("https://cdn.example.com/cv.pdf").as_deref(),
            Some("https://cdn.example.com/cv.pdf")
        );
        assert_eq!(
            resume_link("/uploads/resume-1-2.pdf").as_deref(),
            Some("/uploads/resume-1-2.pdf")
        );
        assert_eq!(
            resume_link("resume-1-2.pdf").as_deref(),
            Some("/uploads/resume-1-2.pdf")
        );
    }
}

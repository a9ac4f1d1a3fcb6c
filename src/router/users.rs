//! Applicant profile and application routes.
//!
//! Applicants authenticate with the external identity provider; the
//! sync endpoint is the only place a profile row is created.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::{Valid, resume_link};
use crate::error::{Result, ServerError};
use crate::middleware::{AuthSubject, AuthUser};
use crate::store::{NewApplication, NewUser};
use crate::{AppState, uploads};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync))
        .route("/data", get(data))
        .route("/applications", get(applications))
        .route("/apply-job", post(apply_job))
        .route("/update-resume", post(update_resume))
        .route("/update-email", post(update_email))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SyncBody {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    first_name: String,
    #[validate(length(min = 1))]
    last_name: String,
}

/// Mirror the provider's identity claims into a local profile,
/// creating it on first sight. Idempotent for an unchanged identity;
/// an email already bound to another subject is a conflict the client
/// resolves through the update-email flow.
async fn sync(
    AuthSubject(subject): AuthSubject,
    State(state): State<AppState>,
    Valid(body): Valid<SyncBody>,
) -> Result<impl IntoResponse> {
    let claims = NewUser {
        subject: subject.clone(),
        email: body.email.clone(),
        first_name: body.first_name,
        last_name: body.last_name,
    };

    if state.store.user_by_subject(&subject).await?.is_some() {
        let user = state.store.update_user_identity(claims).await?;
        return Ok(Json(json!({
            "success": true,
            "action": "updated",
            "user": user,
        })));
    }

    if let Some(existing) = state.store.user_by_email(&body.email).await?
        && existing.subject != subject
    {
        return Err(ServerError::Conflict {
            message: "Email already registered with a different account"
                .into(),
            existing_id: Some(existing.id),
        });
    }

    let user = state.store.create_user(claims).await?;
    Ok(Json(json!({
        "success": true,
        "action": "created",
        "user": user,
    })))
}

async fn data(AuthUser(user): AuthUser) -> impl IntoResponse {
    let link = resume_link(&user.resume);
    Json(json!({ "success": true, "user": user, "resumeLink": link }))
}

/// Apply to a job. A freshly uploaded resume also becomes the profile
/// resume; without one the stored profile resume is reused.
///
/// The profile update happens before the duplicate-application check in
/// `create_application`, so a rejected duplicate still refreshes the
/// stored resume reference.
async fn apply_job(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = uploads::Form::collect(multipart).await?;
    let job_id = form.required("jobId")?;

    let listing = state
        .store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Job not found".into()))?;

    let resume = match &form.file {
        Some(part) => {
            let stored =
                state.files.store(part, uploads::RESUME).await?.reference;
            state.store.update_user_resume(&user.id, &stored).await?;
            stored
        },
        None if !user.resume.is_empty() => user.resume.clone(),
        None => {
            return Err(ServerError::Validation(
                "You must upload a resume to apply for jobs".into(),
            ));
        },
    };

    let application = state
        .store
        .create_application(NewApplication {
            user_id: Some(user.id),
            name: format!("{} {}", user.first_name, user.last_name),
            email: user.email,
            phone: None,
            resume: Some(resume),
            cover_letter: form.get("coverLetter").unwrap_or_default().to_owned(),
            job_id: listing.job.id,
            company_id: listing.job.company_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "application": application })),
    ))
}

/// Applications filed under this profile's id or, for pre-account
/// anonymous submissions, its email.
async fn applications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let applications =
        state.store.user_applications(&user.id, &user.email).await?;

    Ok(Json(json!({
        "success": true,
        "applications": applications,
        "storage": state.store.backend(),
    })))
}

async fn update_resume(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = uploads::Form::collect(multipart).await?;
    let part = form.file.as_ref().ok_or_else(|| {
        ServerError::Validation("resume file is required".into())
    })?;

    let stored = state.files.store(part, uploads::RESUME).await?;
    let user = state
        .store
        .update_user_resume(&user.id, &stored.reference)
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "resumeLink": resume_link(&user.resume),
    })))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateEmailBody {
    #[validate(email)]
    new_email: String,
}

/// Manual remediation for a sync conflict: rebind this subject's
/// profile to a different email, never merging two accounts.
async fn update_email(
    AuthSubject(subject): AuthSubject,
    State(state): State<AppState>,
    Valid(body): Valid<UpdateEmailBody>,
) -> Result<impl IntoResponse> {
    if let Some(existing) = state.store.user_by_email(&body.new_email).await?
        && existing.subject != subject
    {
        return Err(ServerError::Conflict {
            message: "Email already in use by another account".into(),
            existing_id: None,
        });
    }

    let user =
        state.store.update_user_email(&subject, &body.new_email).await?;

    Ok(Json(json!({ "success": true, "user": user })))
}

//! Recruiter account and job management.

use std::borrow::Cow;

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidateEmail};

use super::{Valid, resume_link};
use crate::error::{Result, ServerError};
use crate::mail::Template;
use crate::middleware::AuthCompany;
use crate::model::{ApplicationStatus, CompanySummary, JobCategory, JobLevel};
use crate::store::{NewApplication, NewCompany, NewJob, new_reset_token};
use crate::{AppState, uploads};

/// Reset links stay valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/profile", get(profile))
        .route("/post-job", post(post_job))
        .route("/list-jobs", get(list_jobs))
        .route("/applicants", get(applicants))
        .route("/change-status", post(change_status))
        .route("/change-visibility", post(change_visibility))
        .route("/apply-job", post(apply_job))
        .route("/application-status", get(application_status))
}

/// Create a recruiter account from a multipart form with an optional
/// logo. The allow-list is enforced before anything is written.
async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = uploads::Form::collect(multipart).await?;
    let name = form.required("name")?;
    let email = form.required("email")?;
    let password = form.required("password")?;

    if !email.validate_email() {
        return Err(ServerError::Validation("Invalid email address".into()));
    }
    if !state.config.email_allowed(email) {
        return Err(ServerError::Forbidden(
            "Your company is not authorized to register.".into(),
        ));
    }

    let image = match &form.file {
        Some(part) => {
            Some(state.files.store(part, uploads::LOGO).await?.reference)
        },
        None => None,
    };

    let company = state
        .store
        .create_company(NewCompany {
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash: state.crypto.hash_password(password)?,
            image,
        })
        .await?;
    let token = state.token.create(&company.id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "company": CompanySummary::from(&company),
            "token": token,
        })),
    ))
}

#[derive(Deserialize, Validate)]
struct LoginBody {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

/// Exchange credentials for a signed token. Unknown email and wrong
/// password read the same, and the allow-list is re-checked so removed
/// companies cannot log back in.
async fn login(
    State(state): State<AppState>,
    Valid(body): Valid<LoginBody>,
) -> Result<impl IntoResponse> {
    let invalid = || {
        ServerError::Unauthorized("Invalid email or password".into())
    };

    let company = state
        .store
        .company_by_email(&body.email)
        .await?
        .ok_or_else(invalid)?;
    if !state.crypto.verify_password(&body.password, &company.password) {
        return Err(invalid());
    }
    if !state.config.email_allowed(&company.email) {
        return Err(ServerError::Forbidden(
            "Your company is not authorized to perform this action.".into(),
        ));
    }

    let token = state.token.create(&company.id)?;

    Ok(Json(json!({
        "success": true,
        "company": CompanySummary::from(&company),
        "token": token,
    })))
}

#[derive(Deserialize, Validate)]
struct ForgotPasswordBody {
    #[validate(email)]
    email: String,
}

/// Issue a password-reset token and mail a reset link. The response is
/// identical whether or not the account exists.
async fn forgot_password(
    State(state): State<AppState>,
    Valid(body): Valid<ForgotPasswordBody>,
) -> Result<impl IntoResponse> {
    if let Some(company) = state.store.company_by_email(&body.email).await? {
        let token = new_reset_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        state
            .store
            .set_reset_token(&company.id, &token, expires)
            .await?;

        let reset_url = format!(
            "{}/reset-company-password?token={token}&email={}",
            state.config.front_url().trim_end_matches('/'),
            company.email,
        );
        state
            .mail
            .publish_event(
                Template::ResetPassword {
                    reset_url: Cow::from(reset_url),
                },
                &company.email,
            )
            .await?;
    }

    Ok(Json(json!({
        "success": true,
        "message": "If that account exists, a reset link has been sent",
    })))
}

#[derive(Deserialize, Validate)]
struct ResetPasswordBody {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    token: String,
    #[validate(length(min = 8))]
    password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Valid(body): Valid<ResetPasswordBody>,
) -> Result<impl IntoResponse> {
    let company = state
        .store
        .company_by_reset_token(&body.email, &body.token, Utc::now())
        .await?
        .ok_or_else(|| {
            ServerError::Validation("Invalid or expired token".into())
        })?;

    state
        .store
        .update_company_password(
            &company.id,
            &state.crypto.hash_password(&body.password)?,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password has been reset",
    })))
}

async fn profile(AuthCompany(company): AuthCompany) -> impl IntoResponse {
    Json(json!({ "success": true, "company": company }))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PostJobBody {
    #[validate(length(min = 1))]
    title: String,
    #[validate(length(min = 1))]
    description: String,
    #[validate(length(min = 1))]
    location: String,
    salary: i64,
    level: String,
    category: String,
}

/// Create a job posting, visible by default.
async fn post_job(
    AuthCompany(company): AuthCompany,
    State(state): State<AppState>,
    Valid(body): Valid<PostJobBody>,
) -> Result<impl IntoResponse> {
    let level: JobLevel = body.level.parse().map_err(|_| {
        ServerError::Validation(format!(
            "Invalid level. Must be one of: {}",
            JobLevel::ALL.map(JobLevel::as_str).join(", ")
        ))
    })?;
    let category: JobCategory = body.category.parse().map_err(|_| {
        ServerError::Validation(format!(
            "Invalid category. Must be one of: {}",
            JobCategory::ALL.map(JobCategory::as_str).join(", ")
        ))
    })?;
    if body.salary <= 0 {
        return Err(ServerError::Validation(
            "Salary must be a positive number".into(),
        ));
    }

    let job = state
        .store
        .create_job(NewJob {
            title: body.title,
            description: body.description,
            location: body.location,
            category,
            level,
            salary: body.salary,
            company_id: company.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "job": job }))))
}

/// Recruiter dashboard: own jobs with application counts.
async fn list_jobs(
    AuthCompany(company): AuthCompany,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let jobs = state.store.company_jobs(&company.id).await?;

    Ok(Json(json!({
        "success": true,
        "jobs": jobs,
        "storage": state.store.backend(),
    })))
}

/// Applications to this recruiter's jobs. Profile-backed applications
/// show the profile's current name, email and resume; anonymous ones
/// show what the form captured.
async fn applicants(
    AuthCompany(company): AuthCompany,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let applications: Vec<_> = state
        .store
        .company_applications(&company.id)
        .await?
        .into_iter()
        .map(|row| {
            let name = match (&row.user_first_name, &row.user_last_name) {
                (Some(first), Some(last)) => format!("{first} {last}"),
                _ => row.application.name.clone(),
            };
            let email = row
                .user_email
                .clone()
                .unwrap_or_else(|| row.application.email.clone());
            let resume = row
                .user_resume
                .as_deref()
                .filter(|reference| !reference.is_empty())
                .or(row.application.resume.as_deref())
                .and_then(resume_link);

            json!({
                "id": row.application.id,
                "name": name,
                "email": email,
                "phone": row.application.phone,
                "resume": resume,
                "coverLetter": row.application.cover_letter,
                "status": row.application.status,
                "appliedAt": row.application.applied_at,
                "jobId": row.application.job_id,
                "jobTitle": row.job_title,
                "jobLocation": row.job_location,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "applications": applications,
        "storage": state.store.backend(),
    })))
}

#[derive(Deserialize, Validate)]
struct ChangeStatusBody {
    #[validate(length(min = 1))]
    id: String,
    status: String,
}

async fn change_status(
    AuthCompany(company): AuthCompany,
    State(state): State<AppState>,
    Valid(body): Valid<ChangeStatusBody>,
) -> Result<impl IntoResponse> {
    let status: ApplicationStatus = body.status.parse().map_err(|_| {
        ServerError::Validation(format!(
            "Invalid status. Must be one of: {}",
            ApplicationStatus::ALL
                .map(ApplicationStatus::as_str)
                .join(", ")
        ))
    })?;

    let application =
        state.store.application_by_id(&body.id).await?.ok_or_else(|| {
            ServerError::NotFound("Application not found".into())
        })?;
    if application.company_id != company.id {
        return Err(ServerError::Forbidden(
            "You do not have access to this application".into(),
        ));
    }

    let application =
        state.store.set_application_status(&body.id, status).await?;

    Ok(Json(json!({ "success": true, "application": application })))
}

#[derive(Deserialize, Validate)]
struct ChangeVisibilityBody {
    #[validate(length(min = 1))]
    id: String,
}

/// Flip a job in or out of the public listing.
async fn change_visibility(
    AuthCompany(company): AuthCompany,
    State(state): State<AppState>,
    Valid(body): Valid<ChangeVisibilityBody>,
) -> Result<impl IntoResponse> {
    let listing = state
        .store
        .job_by_id(&body.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Job not found".into()))?;
    if listing.job.company_id != company.id {
        return Err(ServerError::Forbidden(
            "You do not own this job".into(),
        ));
    }

    let job = state
        .store
        .set_job_visibility(&body.id, !listing.job.visible)
        .await?;

    Ok(Json(json!({ "success": true, "job": job })))
}

/// Anonymous application keyed by name and email, no account needed.
async fn apply_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = uploads::Form::collect(multipart).await?;
    let job_id = form.required("jobId")?;
    let name = form.required("name")?;
    let email = form.required("email")?;

    if !email.validate_email() {
        return Err(ServerError::Validation("Invalid email address".into()));
    }

    let listing = state
        .store
        .job_by_id(job_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Job not found".into()))?;
    if !listing.job.visible {
        return Err(ServerError::Validation(
            "This job is not accepting applications".into(),
        ));
    }

    let resume = match &form.file {
        Some(part) => {
            Some(state.files.store(part, uploads::RESUME).await?.reference)
        },
        None => None,
    };

    let application = state
        .store
        .create_application(NewApplication {
            user_id: None,
            name: name.to_owned(),
            email: email.to_owned(),
            phone: form.get("phone").map(str::to_owned),
            resume,
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationStatusQuery {
    email: String,
    job_id: String,
}

/// Status lookup for applicants without an account: the (job, email)
/// pair they applied with is their only handle on the application.
async fn application_status(
    State(state): State<AppState>,
    Query(query): Query<ApplicationStatusQuery>,
) -> Result<impl IntoResponse> {
    if !query.email.validate_email() {
        return Err(ServerError::Validation("Invalid email address".into()));
    }

    let application = state
        .store
        .application_by_job_and_email(&query.job_id, &query.email)
        .await?
        .ok_or_else(|| {
            ServerError::NotFound("Application not found".into())
        })?;
    let listing = state
        .store
        .job_by_id(&application.job_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Job not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "status": application.status,
        "appliedAt": application.applied_at,
        "jobTitle": listing.job.title,
        "companyName": listing.company.name,
    })))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::model::{JobCategory, JobLevel};
    use crate::store::{NewCompany, NewJob};
    use crate::test_util::{make_request, multipart_body, test_state};
    use crate::{AppState, app, config};

    async fn register(
        state: AppState,
        email: &str,
    ) -> (StatusCode, serde_json::Value) {
        let (content_type, body) = multipart_body(
            &[("name", "Acme"), ("email", email), ("password", "hunter42!")],
            None,
        );
        make_request(
            app(state),
            "POST",
            "/api/company/register",
            &[("content-type", &content_type)],
            Body::from(body),
        )
        .await
    }

    fn json_body(value: serde_json::Value) -> Body {
        Body::from(value.to_string())
    }

    const JSON: (&str, &str) = ("content-type", "application/json");

    #[tokio::test]
    async fn register_login_profile_flow() {
        let (state, _dir) = test_state();

        let (status, body) =
            register(state.clone(), "hr@acme.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["company"]["email"], "hr@acme.com");
        assert!(body["company"].get("password").is_none());

        let (status, body) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/login",
            &[JSON],
            json_body(json!({
                "email": "hr@acme.com",
                "password": "hunter42!",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_owned();

        let (status, body) = make_request(
            app(state),
            "GET",
            "/api/company/profile",
            &[("token", &token)],
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["company"]["name"], "Acme");
    }

    #[tokio::test]
    async fn wrong_password_reads_like_unknown_email() {
        let (state, _dir) = test_state();
        register(state.clone(), "hr@acme.com").await;

        let attempt = |email: &str| {
            json_body(json!({ "email": email, "password": "wrong password" }))
        };

        let (status, body) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/login",
            &[JSON],
            attempt("hr@acme.com"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let wrong_password = body["message"].clone();

        let (status, body) = make_request(
            app(state),
            "POST",
            "/api/company/login",
            &[JSON],
            attempt("nobody@acme.com"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], wrong_password);
    }

    #[tokio::test]
    async fn allowlist_blocks_registration_without_a_record() {
        let config = config::Configuration {
            allowed_company_emails: vec!["hr@acme.com".into()],
            ..Default::default()
        };
        let (state, _dir) = crate::test_util::test_state_with(config);

        let (status, body) =
            register(state.clone(), "intruder@evil.com").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert!(
            state
                .store
                .company_by_email("intruder@evil.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn post_job_rejects_invalid_enum_and_salary() {
        let (state, _dir) = test_state();
        let (_, registered) = register(state.clone(), "hr@acme.com").await;
        let token = registered["token"].as_str().unwrap().to_owned();

        let post = |payload: serde_json::Value| {
            let state = state.clone();
            let token = token.clone();
            async move {
                make_request(
                    app(state),
                    "POST",
                    "/api/company/post-job",
                    &[JSON, ("token", &token)],
                    json_body(payload),
                )
                .await
            }
        };

        let (status, body) = post(json!({
            "title": "Backend Engineer",
            "description": "Rust services",
            "location": "Remote",
            "salary": 90000,
            "level": "Wizard",
            "category": "Programming",
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["message"].as_str().unwrap().starts_with("Invalid level")
        );

        let (status, _) = post(json!({
            "title": "Backend Engineer",
            "description": "Rust services",
            "location": "Remote",
            "salary": 0,
            "level": "Mid",
            "category": "Programming",
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post(json!({
            "title": "Data Engineer",
            "description": "Pipelines",
            "location": "Remote",
            "salary": 90000,
            "level": "Mid",
            "category": "Data Science",
        }))
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["job"]["visible"], true);
        assert_eq!(body["job"]["category"], "Data Science");
    }

    #[tokio::test]
    async fn visibility_toggle_requires_ownership() {
        let (state, _dir) = test_state();
        let owner = state
            .store
            .create_company(NewCompany {
                name: "Acme".into(),
                email: "hr@acme.com".into(),
                password_hash: "$argon2id$stub".into(),
                image: None,
            })
            .await
            .unwrap();
        let job = state
            .store
            .create_job(NewJob {
                title: "Backend Engineer".into(),
                description: "Rust services".into(),
                location: "Remote".into(),
                category: JobCategory::Programming,
                level: JobLevel::Mid,
                salary: 90_000,
                company_id: owner.id.clone(),
            })
            .await
            .unwrap();

        let (_, other) = register(state.clone(), "hr@other.com").await;
        let other_token = other["token"].as_str().unwrap();

        let (status, _) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/change-visibility",
            &[JSON, ("token", other_token)],
            json_body(json!({ "id": job.id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Unchanged.
        let listing =
            state.store.job_by_id(&job.id).await.unwrap().unwrap();
        assert!(listing.job.visible);
    }

    #[tokio::test]
    async fn change_status_failure_modes() {
        let (state, _dir) = test_state();
        let (_, registered) = register(state.clone(), "hr@acme.com").await;
        let token = registered["token"].as_str().unwrap().to_owned();

        let (status, _) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/change-status",
            &[JSON, ("token", &token)],
            json_body(json!({ "id": "a1", "status": "hired" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = make_request(
            app(state),
            "POST",
            "/api/company/change-status",
            &[JSON, ("token", &token)],
            json_body(json!({ "id": "missing", "status": "accepted" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn forgot_then_reset_password() {
        let (state, _dir) = test_state();
        let (_, registered) = register(state.clone(), "hr@acme.com").await;
        let company_id = registered["company"]["id"].as_str().unwrap();

        let (status, _) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/forgot-password",
            &[JSON],
            json_body(json!({ "email": "hr@acme.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let token = state
            .store
            .company_by_id(company_id)
            .await
            .unwrap()
            .unwrap()
            .reset_token
            .unwrap();

        let (status, _) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/reset-password",
            &[JSON],
            json_body(json!({
                "email": "hr@acme.com",
                "token": token,
                "password": "new-password",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = make_request(
            app(state),
            "POST",
            "/api/company/login",
            &[JSON],
            json_body(json!({
                "email": "hr@acme.com",
                "password": "new-password",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn forgot_password_never_reveals_account_existence() {
        let (state, _dir) = test_state();

        let (status, body) = make_request(
            app(state),
            "POST",
            "/api/company/forgot-password",
            &[JSON],
            json_body(json!({ "email": "nobody@acme.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn reset_with_bad_token_rejected() {
        let (state, _dir) = test_state();
        register(state.clone(), "hr@acme.com").await;

        let (status, body) = make_request(
            app(state),
            "POST",
            "/api/company/reset-password",
            &[JSON],
            json_body(json!({
                "email": "hr@acme.com",
                "token": "forged",
                "password": "new-password",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn anonymous_apply_flow() {
        let (state, _dir) = test_state();
        let (_, registered) = register(state.clone(), "hr@acme.com").await;
        let token = registered["token"].as_str().unwrap().to_owned();

        let (_, posted) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/post-job",
            &[JSON, ("token", &token)],
            json_body(json!({
                "title": "Backend Engineer",
                "description": "Rust services",
                "location": "Remote",
                "salary": 90000,
                "level": "Mid",
                "category": "Programming",
            })),
        )
        .await;
        let job_id = posted["job"]["id"].as_str().unwrap().to_owned();

        let apply = |email: &str| {
            multipart_body(
                &[
                    ("jobId", &job_id),
                    ("name", "Jo Applicant"),
                    ("email", email),
                ],
                Some(("resume", "cv.pdf", "application/pdf", b"%PDF-1.4")),
            )
        };

        let (content_type, body) = apply("jo@mail.com");
        let (status, response) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/apply-job",
            &[("content-type", &content_type)],
            Body::from(body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response["application"]["status"], "pending");

        // Same email, same job: rejected, still one record.
        let (content_type, body) = apply("jo@mail.com");
        let (status, response) = make_request(
            app(state.clone()),
            "POST",
            "/api/company/apply-job",
            &[("content-type", &content_type)],
            Body::from(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response["message"],
            "You have already applied for this job"
        );

        let (_, applicants) = make_request(
            app(state.clone()),
            "GET",
            "/api/company/applicants",
            &[("token", &token)],
            Body::empty(),
        )
        .await;
        let rows = applicants["applications"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Jo Applicant");
        assert!(
            rows[0]["resume"]
                .as_str()
                .unwrap()
                .starts_with("/uploads/resume-")
        );

        // Hidden jobs stop accepting applications.
        state
            .store
            .set_job_visibility(&job_id, false)
            .await
            .unwrap();
        let (content_type, body) = apply("other@mail.com");
        let (status, _) = make_request(
            app(state),
            "POST",
            "/api/company/apply-job",
            &[("content-type", &content_type)],
            Body::from(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn anonymous_status_lookup() {
        let (state, _dir) = test_state();
        let company = state
            .store
            .create_company(NewCompany {
                name: "Acme".into(),
                email: "hr@acme.com".into(),
                password_hash: "$argon2id$stub".into(),
                image: None,
            })
            .await
            .unwrap();
        let job = state
            .store
            .create_job(NewJob {
                title: "Backend Engineer".into(),
                description: "Rust services".into(),
                location: "Remote".into(),
                category: JobCategory::Programming,
                level: JobLevel::Mid,
                salary: 90_000,
                company_id: company.id.clone(),
            })
            .await
            .unwrap();
        state
            .store
            .create_application(crate::store::NewApplication {
                user_id: None,
                name: "Jo Applicant".into(),
                email: "jo@mail.com".into(),
                phone: None,
                resume: None,
                cover_letter: String::new(),
                job_id: job.id.clone(),
                company_id: company.id,
            })
            .await
            .unwrap();

        let (status, body) = make_request(
            app(state.clone()),
            "GET",
            &format!(
                "/api/company/application-status?email=jo@mail.com&jobId={}",
                job.id
            ),
            &[],
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["jobTitle"], "Backend Engineer");
        assert_eq!(body["companyName"], "Acme");

        // Unknown email for this job.
        let (status, _) = make_request(
            app(state),
            "GET",
            &format!(
                "/api/company/application-status?email=other@mail.com&jobId={}",
                job.id
            ),
            &[],
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn allowlist_removal_blocks_login() {
        let (state, _dir) = test_state();
        register(state.clone(), "hr@acme.com").await;

        // Same store, restricted configuration.
        let state = AppState {
            config: std::sync::Arc::new(config::Configuration {
                allowed_company_emails: vec!["someoneelse@acme.com".into()],
                ..Default::default()
            }),
            ..state
        };

        let (status, body) = make_request(
            app(state),
            "POST",
            "/api/company/login",
            &[JSON],
            json_body(json!({
                "email": "hr@acme.com",
                "password": "hunter42!",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn anonymous_apply_rejects_malformed_email() {
        let (state, _dir) = test_state();

        let (content_type, body) = multipart_body(
            &[
                ("jobId", "j1"),
                ("name", "Jo Applicant"),
                ("email", "not-an-email"),
            ],
            None,
        );
        let (status, response) = make_request(
            app(state),
            "POST",
            "/api/company/apply-job",
            &[("content-type", &content_type)],
            Body::from(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Invalid email address");
    }

    #[tokio::test]
    async fn list_jobs_counts_applications() {
        let (state, _dir) = test_state();
        let (_, registered) = register(state.clone(), "hr@acme.com").await;
        let token = registered["token"].as_str().unwrap().to_owned();
        let company_id = registered["company"]["id"].as_str().unwrap();

        let job = state
            .store
            .create_job(NewJob {
                title: "Backend Engineer".into(),
                description: "Rust services".into(),
                location: "Remote".into(),
                category: JobCategory::Programming,
                level: JobLevel::Mid,
                salary: 90_000,
                company_id: company_id.into(),
            })
            .await
            .unwrap();
        state
            .store
            .create_application(crate::store::NewApplication {
                user_id: None,
                name: "Jo Applicant".into(),
                email: "jo@mail.com".into(),
                phone: None,
                resume: None,
                cover_letter: String::new(),
                job_id: job.id,
                company_id: company_id.into(),
            })
            .await
            .unwrap();

        let (status, body) = make_request(
            app(state),
            "GET",
            "/api/company/list-jobs",
            &[("token", &token)],
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "In-Memory");
        assert_eq!(body["jobs"][0]["applicationCount"], 1);
    }
}

//! Public job listing.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::AppState;
use crate::error::{Result, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs))
        .route("/{id}", get(get_job))
}

/// Visible jobs with their companies, newest first. The storage tag
/// tells the client whether it is talking to the durable store or the
/// degraded in-memory one.
async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let jobs = state.store.visible_jobs().await?;

    Ok(Json(json!({
        "success": true,
        "count": jobs.len(),
        "jobs": jobs,
        "storage": state.store.backend(),
    })))
}

/// One job by id. Hidden jobs stay addressable here, only the listing
/// filters them out.
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let job = state
        .store
        .job_by_id(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Job not found".into()))?;

    Ok(Json(json!({ "success": true, "job": job })))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;

    use crate::store::{NewCompany, NewJob};
    use crate::test_util::{make_request, test_state};
    use crate::{app, model};

    async fn seed(
        state: &crate::AppState,
    ) -> (model::Company, model::Job, model::Job) {
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

        let job = |title: &str| NewJob {
            title: title.into(),
            description: "Rust services".into(),
            location: "Remote".into(),
            category: model::JobCategory::Programming,
            level: model::JobLevel::Mid,
            salary: 90_000,
            company_id: company.id.clone(),
        };
        let visible = state.store.create_job(job("Visible")).await.unwrap();
        let hidden = state.store.create_job(job("Hidden")).await.unwrap();
        state
            .store
            .set_job_visibility(&hidden.id, false)
            .await
            .unwrap();

        (company, visible, hidden)
    }

    #[tokio::test]
    async fn listing_only_contains_visible_jobs() {
        let (state, _dir) = test_state();
        seed(&state).await;

        let (status, body) =
            make_request(app(state), "GET", "/api/jobs", &[], Body::empty())
                .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["storage"], "In-Memory");
        assert_eq!(body["jobs"][0]["title"], "Visible");
        assert!(body["jobs"][0]["company"].get("password").is_none());
    }

    #[tokio::test]
    async fn hidden_job_still_served_by_id() {
        let (state, _dir) = test_state();
        let (_, _, hidden) = seed(&state).await;

        let (status, body) = make_request(
            app(state),
            "GET",
            &format!("/api/jobs/{}", hidden.id),
            &[],
            Body::empty(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["job"]["title"], "Hidden");
        assert_eq!(body["job"]["visible"], false);
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let (state, _dir) = test_state();

        let (status, body) = make_request(
            app(state),
            "GET",
            "/api/jobs/does-not-exist",
            &[],
            Body::empty(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Job not found");
    }
}

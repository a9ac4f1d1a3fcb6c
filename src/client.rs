//! HTTP client for the jobport API.
//!
//! Holds the session credentials, a cache of the public job list and
//! the active search filter. Transient network failures are retried
//! with a linear backoff; HTTP error responses are surfaced as-is and
//! never retried.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);
/// Applied to the application-fetch and sync calls only.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not logged in")]
    NotLoggedIn,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Case-insensitive substring filter over the cached job list. Empty
/// terms match everything.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub title: String,
    pub location: String,
}

impl SearchFilter {
    pub fn matches(&self, job: &JobListing) -> bool {
        let contains = |haystack: &str, needle: &str| {
            needle.is_empty()
                || haystack.to_lowercase().contains(&needle.to_lowercase())
        };

        contains(&job.title, &self.title)
            && contains(&job.location, &self.location)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub location: String,
    pub category: String,
    pub level: String,
    pub salary: i64,
    pub company: CompanyInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: String,
    pub status: String,
    pub job_title: String,
    pub job_location: String,
    pub company_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncOutcome {
    pub action: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    recruiter_token: Option<String>,
    bearer_token: Option<String>,
    jobs: Vec<JobListing>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> std::result::Result<Self, url::ParseError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            recruiter_token: None,
            bearer_token: None,
            jobs: Vec::new(),
        })
    }

    pub fn set_recruiter_token(&mut self, token: impl Into<String>) {
        self.recruiter_token = Some(token.into());
    }

    pub fn set_bearer_token(&mut self, token: impl Into<String>) {
        self.bearer_token = Some(token.into());
    }

    /// Refresh the cached public job list.
    pub async fn fetch_jobs(&mut self) -> Result<&[JobListing]> {
        let url = self.base_url.join("api/jobs")?;
        let response = self
            .send_with_retry(|| self.http.get(url.clone()))
            .await?;

        self.jobs = read_envelope(response, "jobs").await?;
        Ok(&self.jobs)
    }

    /// Cached jobs matching the filter.
    pub fn filtered_jobs(&self, filter: &SearchFilter) -> Vec<&JobListing> {
        self.jobs.iter().filter(|job| filter.matches(job)).collect()
    }

    /// Applications of the logged-in applicant.
    pub async fn fetch_applications(&self) -> Result<Vec<ApplicationView>> {
        let bearer =
            self.bearer_token.as_ref().ok_or(ClientError::NotLoggedIn)?;

        let url = self.base_url.join("api/users/applications")?;
        let response = self
            .send_with_retry(|| {
                self.http
                    .get(url.clone())
                    .bearer_auth(bearer)
                    .timeout(CALL_TIMEOUT)
            })
            .await?;

        read_envelope(response, "applications").await
    }

    /// Mirror the identity provider's claims into the server profile.
    pub async fn sync_profile(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<SyncOutcome> {
        let bearer =
            self.bearer_token.as_ref().ok_or(ClientError::NotLoggedIn)?;

        let url = self.base_url.join("api/users/sync")?;
        let body = serde_json::json!({
            "email": email,
            "firstName": first_name,
            "lastName": last_name,
        });
        let response = self
            .send_with_retry(|| {
                self.http
                    .post(url.clone())
                    .bearer_auth(bearer)
                    .timeout(CALL_TIMEOUT)
                    .json(&body)
            })
            .await?;

        let status = response.status();
        let value: serde_json::Value = response.json().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &value));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Jobs of the logged-in recruiter, with application counts.
    pub async fn fetch_company_jobs(&self) -> Result<serde_json::Value> {
        let token = self
            .recruiter_token
            .as_ref()
            .ok_or(ClientError::NotLoggedIn)?;

        let url = self.base_url.join("api/company/list-jobs")?;
        let response = self
            .send_with_retry(|| {
                self.http.get(url.clone()).header("token", token)
            })
            .await?;

        read_envelope(response, "jobs").await
    }

    /// Retry transient network failures only. A response, even an
    /// error one, ends the loop.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut attempt = 1;
        loop {
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < MAX_ATTEMPTS && is_transient(&err) => {
                    tracing::debug!(
                        attempt,
                        error = %err,
                        "transient network failure, retrying"
                    );
                    tokio::time::sleep(backoff(attempt)).await;
                    attempt += 1;
                },
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Api {
            status: 0,
            message: err.to_string(),
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Linear backoff on the attempt number.
fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE * attempt
}

fn api_error(status: u16, value: &serde_json::Value) -> ClientError {
    let message = value["message"]
        .as_str()
        .unwrap_or("request failed")
        .to_owned();
    ClientError::Api { status, message }
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    key: &str,
) -> Result<T> {
    let status = response.status();
    let value: serde_json::Value = response.json().await?;
    if !status.is_success() || value["success"] != true {
        return Err(api_error(status.as_u16(), &value));
    }

    Ok(serde_json::from_value(value[key].clone())?)
}

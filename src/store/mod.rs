//! Storage abstraction.
//!
//! One [`Storage`] implementation is selected at startup and injected
//! into the handlers: [`PostgresStore`] when the database is reachable,
//! [`MemoryStore`] otherwise. Uniqueness of applications per job is a
//! store concern, not a handler-level check-then-insert.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;

use crate::error::Result;
use crate::model::{
    Application, ApplicationStatus, Company, CompanyApplicationRow,
    CompanyJobRow, Job, JobCategory, JobLevel, JobWithCompany, User,
    UserApplicationRow,
};

const ID_LENGTH: usize = 24;
const RESET_TOKEN_BYTES: usize = 32;

/// Generate a fresh record id.
pub fn new_id() -> String {
    Alphanumeric.sample_string(&mut OsRng, ID_LENGTH)
}

/// Generate a password-reset token.
pub fn new_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub subject: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: JobCategory,
    pub level: JobLevel,
    pub salary: i64,
    pub company_id: String,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume: Option<String>,
    pub cover_letter: String,
    pub job_id: String,
    pub company_id: String,
}

/// Persistence operations needed by the API.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Storage-origin tag surfaced on list responses.
    fn backend(&self) -> &'static str;

    // Companies.
    async fn create_company(&self, company: NewCompany) -> Result<Company>;
    async fn company_by_id(&self, id: &str) -> Result<Option<Company>>;
    async fn company_by_email(&self, email: &str) -> Result<Option<Company>>;
    async fn set_reset_token(
        &self,
        company_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    /// Company matching an unexpired reset token.
    async fn company_by_reset_token(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>>;
    /// Replace the password and clear any reset token.
    async fn update_company_password(
        &self,
        company_id: &str,
        password_hash: &str,
    ) -> Result<()>;

    // Users.
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn user_by_subject(&self, subject: &str) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Refresh provider claims on an existing profile.
    async fn update_user_identity(&self, user: NewUser) -> Result<User>;
    async fn update_user_resume(
        &self,
        user_id: &str,
        resume: &str,
    ) -> Result<User>;
    async fn update_user_email(
        &self,
        subject: &str,
        email: &str,
    ) -> Result<User>;

    // Jobs.
    async fn create_job(&self, job: NewJob) -> Result<Job>;
    async fn job_by_id(&self, id: &str) -> Result<Option<JobWithCompany>>;
    async fn visible_jobs(&self) -> Result<Vec<JobWithCompany>>;
    async fn company_jobs(&self, company_id: &str)
    -> Result<Vec<CompanyJobRow>>;
    async fn set_job_visibility(
        &self,
        job_id: &str,
        visible: bool,
    ) -> Result<Job>;

    // Applications.
    /// Fails with a duplicate error when the (job, applicant) or
    /// (job, email) pair already exists.
    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<Application>;
    async fn application_by_id(&self, id: &str)
    -> Result<Option<Application>>;
    /// Anonymous status lookup keyed by the (job, email) pair.
    async fn application_by_job_and_email(
        &self,
        job_id: &str,
        email: &str,
    ) -> Result<Option<Application>>;
    async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Application>;
    async fn company_applications(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyApplicationRow>>;
    /// Applications filed under this applicant's id or email.
    async fn user_applications(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Vec<UserApplicationRow>>;
}

pub(crate) const DUPLICATE_APPLICATION: &str =
    "You have already applied for this job";

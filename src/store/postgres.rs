//! Durable storage on PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{
    DUPLICATE_APPLICATION, NewApplication, NewCompany, NewJob, NewUser,
    Storage, new_id,
};
use crate::config::Postgres as PostgresConfig;
use crate::error::{Result, ServerError};
use crate::model::{
    Application, ApplicationStatus, Company, CompanyApplicationRow,
    CompanyJobRow, CompanySummary, Job, JobWithCompany, User,
    UserApplicationRow,
};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "jobport";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// PostgreSQL-backed [`Storage`] implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(sqlx::FromRow)]
struct JobListingRow {
    #[sqlx(flatten)]
    job: Job,
    company_name: String,
    company_email: String,
    company_image: Option<String>,
}

impl From<JobListingRow> for JobWithCompany {
    fn from(row: JobListingRow) -> Self {
        let company = CompanySummary {
            id: row.job.company_id.clone(),
            name: row.company_name,
            email: row.company_email,
            image: row.company_image,
        };
        Self {
            job: row.job,
            company,
        }
    }
}

impl PostgresStore {
    /// Connect and run pending migrations.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let username = config
            .username
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIALS);
        let password = config
            .password
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIALS);
        let database = config
            .database
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_NAME);
        let addr = format!(
            "postgres://{username}:{password}@{}/{database}",
            config.address
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
            .connect(&addr)
            .await?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|err| ServerError::Internal(err.to_string()))?;

        tracing::info!(hostname = %config.address, %database, "postgres connected");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Storage for PostgresStore {
    fn backend(&self) -> &'static str {
        "Postgres"
    }

    async fn create_company(&self, company: NewCompany) -> Result<Company> {
        sqlx::query_as::<_, Company>(
            r#"INSERT INTO companies (id, name, email, password, image)
               VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
        )
        .bind(new_id())
        .bind(&company.name)
        .bind(&company.email)
        .bind(&company.password_hash)
        .bind(&company.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServerError::Duplicate(
                    "Company with this email already exists".into(),
                )
            } else {
                err.into()
            }
        })
    }

    async fn company_by_id(&self, id: &str) -> Result<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn company_by_email(&self, email: &str) -> Result<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_reset_token(
        &self,
        company_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE companies SET reset_token = $2, reset_expires = $3
               WHERE id = $1"#,
        )
        .bind(company_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn company_by_reset_token(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>> {
        Ok(sqlx::query_as::<_, Company>(
            r#"SELECT * FROM companies
               WHERE email = $1 AND reset_token = $2 AND reset_expires > $3"#,
        )
        .bind(email)
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_company_password(
        &self,
        company_id: &str,
        password_hash: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE companies
               SET password = $2, reset_token = NULL, reset_expires = NULL
               WHERE id = $1"#,
        )
        .bind(company_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, subject, email, first_name, last_name)
               VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
        )
        .bind(new_id())
        .bind(&user.subject)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServerError::Conflict {
                    message: "User already exists".into(),
                    existing_id: None,
                }
            } else {
                err.into()
            }
        })
    }

    async fn user_by_subject(&self, subject: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE subject = $1",
            )
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_user_identity(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET email = $2, first_name = $3, last_name = $4,
                   updated_at = now()
               WHERE subject = $1 RETURNING *"#,
        )
        .bind(&user.subject)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServerError::Conflict {
                    message:
                        "Email already registered with a different account"
                            .into(),
                    existing_id: None,
                }
            } else {
                ServerError::from(err)
            }
        })?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))
    }

    async fn update_user_resume(
        &self,
        user_id: &str,
        resume: &str,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users SET resume = $2, updated_at = now()
               WHERE id = $1 RETURNING *"#,
        )
        .bind(user_id)
        .bind(resume)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))
    }

    async fn update_user_email(
        &self,
        subject: &str,
        email: &str,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users SET email = $2, updated_at = now()
               WHERE subject = $1 RETURNING *"#,
        )
        .bind(subject)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServerError::Conflict {
                    message: "Email already in use by another account".into(),
                    existing_id: None,
                }
            } else {
                ServerError::from(err)
            }
        })?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))
    }

    async fn create_job(&self, job: NewJob) -> Result<Job> {
        Ok(sqlx::query_as::<_, Job>(
            r#"INSERT INTO jobs
               (id, title, description, location, category, level, salary,
                company_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *"#,
        )
        .bind(new_id())
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.category)
        .bind(job.level)
        .bind(job.salary)
        .bind(&job.company_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn job_by_id(&self, id: &str) -> Result<Option<JobWithCompany>> {
        Ok(sqlx::query_as::<_, JobListingRow>(
            r#"SELECT j.*, c.name AS company_name, c.email AS company_email,
                      c.image AS company_image
               FROM jobs j JOIN companies c ON c.id = j.company_id
               WHERE j.id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into))
    }

    async fn visible_jobs(&self) -> Result<Vec<JobWithCompany>> {
        Ok(sqlx::query_as::<_, JobListingRow>(
            r#"SELECT j.*, c.name AS company_name, c.email AS company_email,
                      c.image AS company_image
               FROM jobs j JOIN companies c ON c.id = j.company_id
               WHERE j.visible ORDER BY j.created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
    }

    async fn company_jobs(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyJobRow>> {
        Ok(sqlx::query_as::<_, CompanyJobRow>(
            r#"SELECT j.*, COUNT(a.id) AS application_count
               FROM jobs j LEFT JOIN applications a ON a.job_id = j.id
               WHERE j.company_id = $1
               GROUP BY j.id ORDER BY j.created_at DESC"#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_job_visibility(
        &self,
        job_id: &str,
        visible: bool,
    ) -> Result<Job> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET visible = $2 WHERE id = $1 RETURNING *",
        )
        .bind(job_id)
        .bind(visible)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServerError::NotFound("Job not found".into()))
    }

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<Application> {
        sqlx::query_as::<_, Application>(
            r#"INSERT INTO applications
               (id, user_id, name, email, phone, resume, cover_letter,
                job_id, company_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *"#,
        )
        .bind(new_id())
        .bind(&application.user_id)
        .bind(&application.name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.resume)
        .bind(&application.cover_letter)
        .bind(&application.job_id)
        .bind(&application.company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServerError::Duplicate(DUPLICATE_APPLICATION.into())
            } else {
                err.into()
            }
        })
    }

    async fn application_by_id(
        &self,
        id: &str,
    ) -> Result<Option<Application>> {
        Ok(sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn application_by_job_and_email(
        &self,
        job_id: &str,
        email: &str,
    ) -> Result<Option<Application>> {
        Ok(sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE job_id = $1 AND email = $2",
        )
        .bind(job_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Application> {
        sqlx::query_as::<_, Application>(
            r#"UPDATE applications SET status = $2, updated_at = now()
               WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            ServerError::NotFound("Application not found".into())
        })
    }

    async fn company_applications(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyApplicationRow>> {
        Ok(sqlx::query_as::<_, CompanyApplicationRow>(
            r#"SELECT a.*,
                      j.title AS job_title, j.location AS job_location,
                      u.resume AS user_resume,
                      u.first_name AS user_first_name,
                      u.last_name AS user_last_name,
                      u.email AS user_email
               FROM applications a
               JOIN jobs j ON j.id = a.job_id
               LEFT JOIN users u ON u.id = a.user_id
               WHERE a.company_id = $1
               ORDER BY a.applied_at DESC"#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn user_applications(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Vec<UserApplicationRow>> {
        Ok(sqlx::query_as::<_, UserApplicationRow>(
            r#"SELECT a.id, a.status, a.applied_at,
                      j.title AS job_title, j.location AS job_location,
                      j.salary AS job_salary,
                      c.name AS company_name, c.image AS company_image
               FROM applications a
               JOIN jobs j ON j.id = a.job_id
               JOIN companies c ON c.id = a.company_id
               WHERE a.user_id = $1 OR a.email = $2
               ORDER BY a.applied_at DESC"#,
        )
        .bind(user_id)
        .bind(email)
        .fetch_all(&self.pool)
        .await?)
    }
}

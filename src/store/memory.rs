//! Process-lifetime in-memory storage.
//!
//! Degraded-mode substitute used when PostgreSQL is unreachable at
//! startup. Contents are process-local, never reconciled back to the
//! durable store and lost on restart. All mutations run under a single
//! write lock, so the duplicate-application check and insert are atomic
//! here too.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    DUPLICATE_APPLICATION, NewApplication, NewCompany, NewJob, NewUser,
    Storage, new_id,
};
use crate::error::{Result, ServerError};
use crate::model::{
    Application, ApplicationStatus, Company, CompanyApplicationRow,
    CompanyJobRow, CompanySummary, Job, JobWithCompany, Role, User,
    UserApplicationRow,
};

#[derive(Default)]
struct World {
    companies: HashMap<String, Company>,
    users: HashMap<String, User>,
    jobs: HashMap<String, Job>,
    applications: HashMap<String, Application>,
}

/// In-memory [`Storage`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    world: RwLock<World>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> ServerError {
    ServerError::Internal("storage lock poisoned".into())
}

fn with_company(world: &World, job: &Job) -> Result<JobWithCompany> {
    let company = world.companies.get(&job.company_id).ok_or_else(|| {
        ServerError::Internal(format!(
            "job {} references missing company {}",
            job.id, job.company_id
        ))
    })?;

    Ok(JobWithCompany {
        job: job.clone(),
        company: CompanySummary::from(company),
    })
}

#[async_trait]
impl Storage for MemoryStore {
    fn backend(&self) -> &'static str {
        "In-Memory"
    }

    async fn create_company(&self, company: NewCompany) -> Result<Company> {
        let mut world = self.world.write().map_err(|_| poisoned())?;

        if world.companies.values().any(|c| c.email == company.email) {
            return Err(ServerError::Duplicate(
                "Company with this email already exists".into(),
            ));
        }

        let record = Company {
            id: new_id(),
            name: company.name,
            email: company.email,
            password: company.password_hash,
            image: company.image,
            reset_token: None,
            reset_expires: None,
            created_at: Utc::now(),
        };
        world.companies.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn company_by_id(&self, id: &str) -> Result<Option<Company>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world.companies.get(id).cloned())
    }

    async fn company_by_email(&self, email: &str) -> Result<Option<Company>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world.companies.values().find(|c| c.email == email).cloned())
    }

    async fn set_reset_token(
        &self,
        company_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut world = self.world.write().map_err(|_| poisoned())?;
        let company = world
            .companies
            .get_mut(company_id)
            .ok_or_else(|| ServerError::NotFound("Company not found".into()))?;

        company.reset_token = Some(token.to_owned());
        company.reset_expires = Some(expires_at);
        Ok(())
    }

    async fn company_by_reset_token(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Company>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world
            .companies
            .values()
            .find(|c| {
                c.email == email
                    && c.reset_token.as_deref() == Some(token)
                    && c.reset_expires.is_some_and(|expires| expires > now)
            })
            .cloned())
    }

    async fn update_company_password(
        &self,
        company_id: &str,
        password_hash: &str,
    ) -> Result<()> {
        let mut world = self.world.write().map_err(|_| poisoned())?;
        let company = world
            .companies
            .get_mut(company_id)
            .ok_or_else(|| ServerError::NotFound("Company not found".into()))?;

        company.password = password_hash.to_owned();
        company.reset_token = None;
        company.reset_expires = None;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut world = self.world.write().map_err(|_| poisoned())?;

        if world
            .users
            .values()
            .any(|u| u.subject == user.subject || u.email == user.email)
        {
            return Err(ServerError::Conflict {
                message: "User already exists".into(),
                existing_id: None,
            });
        }

        let now = Utc::now();
        let record = User {
            id: new_id(),
            subject: user.subject,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: Role::User,
            resume: String::new(),
            created_at: now,
            updated_at: now,
        };
        world.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn user_by_subject(&self, subject: &str) -> Result<Option<User>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world.users.values().find(|u| u.subject == subject).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user_identity(&self, user: NewUser) -> Result<User> {
        let mut world = self.world.write().map_err(|_| poisoned())?;

        if world
            .users
            .values()
            .any(|u| u.email == user.email && u.subject != user.subject)
        {
            return Err(ServerError::Conflict {
                message: "Email already registered with a different account"
                    .into(),
                existing_id: None,
            });
        }

        let record = world
            .users
            .values_mut()
            .find(|u| u.subject == user.subject)
            .ok_or_else(|| {
                ServerError::NotFound("User not found".into())
            })?;

        record.email = user.email;
        record.first_name = user.first_name;
        record.last_name = user.last_name;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_user_resume(
        &self,
        user_id: &str,
        resume: &str,
    ) -> Result<User> {
        let mut world = self.world.write().map_err(|_| poisoned())?;
        let record = world
            .users
            .get_mut(user_id)
            .ok_or_else(|| ServerError::NotFound("User not found".into()))?;

        record.resume = resume.to_owned();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_user_email(
        &self,
        subject: &str,
        email: &str,
    ) -> Result<User> {
        let mut world = self.world.write().map_err(|_| poisoned())?;

        if world
            .users
            .values()
            .any(|u| u.email == email && u.subject != subject)
        {
            return Err(ServerError::Conflict {
                message: "Email already in use by another account".into(),
                existing_id: None,
            });
        }

        let record = world
            .users
            .values_mut()
            .find(|u| u.subject == subject)
            .ok_or_else(|| {
                ServerError::NotFound("User not found".into())
            })?;

        record.email = email.to_owned();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn create_job(&self, job: NewJob) -> Result<Job> {
        let mut world = self.world.write().map_err(|_| poisoned())?;

        let record = Job {
            id: new_id(),
            title: job.title,
            description: job.description,
            location: job.location,
            category: job.category,
            level: job.level,
            salary: job.salary,
            visible: true,
            company_id: job.company_id,
            created_at: Utc::now(),
        };
        world.jobs.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn job_by_id(&self, id: &str) -> Result<Option<JobWithCompany>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        world
            .jobs
            .get(id)
            .map(|job| with_company(&world, job))
            .transpose()
    }

    async fn visible_jobs(&self) -> Result<Vec<JobWithCompany>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        let mut jobs: Vec<JobWithCompany> = world
            .jobs
            .values()
            .filter(|job| job.visible)
            .map(|job| with_company(&world, job))
            .collect::<Result<_>>()?;

        jobs.sort_by(|a, b| b.job.created_at.cmp(&a.job.created_at));
        Ok(jobs)
    }

    async fn company_jobs(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyJobRow>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        let mut rows: Vec<CompanyJobRow> = world
            .jobs
            .values()
            .filter(|job| job.company_id == company_id)
            .map(|job| CompanyJobRow {
                job: job.clone(),
                application_count: world
                    .applications
                    .values()
                    .filter(|app| app.job_id == job.id)
                    .count() as i64,
            })
            .collect();

        rows.sort_by(|a, b| b.job.created_at.cmp(&a.job.created_at));
        Ok(rows)
    }

    async fn set_job_visibility(
        &self,
        job_id: &str,
        visible: bool,
    ) -> Result<Job> {
        let mut world = self.world.write().map_err(|_| poisoned())?;
        let job = world
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ServerError::NotFound("Job not found".into()))?;

        job.visible = visible;
        Ok(job.clone())
    }

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<Application> {
        let mut world = self.world.write().map_err(|_| poisoned())?;

        let duplicate = world.applications.values().any(|app| {
            app.job_id == application.job_id
                && (app.email == application.email
                    || (application.user_id.is_some()
                        && app.user_id == application.user_id))
        });
        if duplicate {
            return Err(ServerError::Duplicate(DUPLICATE_APPLICATION.into()));
        }

        let now = Utc::now();
        let record = Application {
            id: new_id(),
            user_id: application.user_id,
            name: application.name,
            email: application.email,
            phone: application.phone,
            resume: application.resume,
            cover_letter: application.cover_letter,
            job_id: application.job_id,
            company_id: application.company_id,
            status: ApplicationStatus::Pending,
            applied_at: now,
            updated_at: now,
        };
        world
            .applications
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn application_by_id(
        &self,
        id: &str,
    ) -> Result<Option<Application>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world.applications.get(id).cloned())
    }

    async fn application_by_job_and_email(
        &self,
        job_id: &str,
        email: &str,
    ) -> Result<Option<Application>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        Ok(world
            .applications
            .values()
            .find(|app| app.job_id == job_id && app.email == email)
            .cloned())
    }

    async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Application> {
        let mut world = self.world.write().map_err(|_| poisoned())?;
        let application = world.applications.get_mut(id).ok_or_else(|| {
            ServerError::NotFound("Application not found".into())
        })?;

        application.status = status;
        application.updated_at = Utc::now();
        Ok(application.clone())
    }

    async fn company_applications(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyApplicationRow>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        let mut rows: Vec<CompanyApplicationRow> = world
            .applications
            .values()
            .filter(|app| app.company_id == company_id)
            .filter_map(|app| {
                let job = world.jobs.get(&app.job_id)?;
                let user = app
                    .user_id
                    .as_ref()
                    .and_then(|id| world.users.get(id));

                Some(CompanyApplicationRow {
                    application: app.clone(),
                    job_title: job.title.clone(),
                    job_location: job.location.clone(),
                    user_resume: user.map(|u| u.resume.clone()),
                    user_first_name: user.map(|u| u.first_name.clone()),
                    user_last_name: user.map(|u| u.last_name.clone()),
                    user_email: user.map(|u| u.email.clone()),
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.application.applied_at.cmp(&a.application.applied_at)
        });
        Ok(rows)
    }

    async fn user_applications(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Vec<UserApplicationRow>> {
        let world = self.world.read().map_err(|_| poisoned())?;
        let mut rows: Vec<UserApplicationRow> = world
            .applications
            .values()
            .filter(|app| {
                app.user_id.as_deref() == Some(user_id) || app.email == email
            })
            .filter_map(|app| {
                let job = world.jobs.get(&app.job_id)?;
                let company = world.companies.get(&app.company_id)?;

                Some(UserApplicationRow {
                    id: app.id.clone(),
                    status: app.status,
                    applied_at: app.applied_at,
                    job_title: job.title.clone(),
                    job_location: job.location.clone(),
                    job_salary: job.salary,
                    company_name: company.name.clone(),
                    company_image: company.image.clone(),
                })
            })
            .collect();

        rows.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(rows)
    }
}

//! Domain records and the enumerations shared by handlers and stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recruiter account. Credentials and reset state never leave the
/// server.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub image: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public slice of a [`Company`] embedded in job listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

impl From<&Company> for CompanySummary {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id.clone(),
            name: company.name.clone(),
            email: company.email.clone(),
            image: company.image.clone(),
        }
    }
}

/// Applicant profile mirrored from the identity provider. `subject` is
/// the provider's stable identifier; `resume` is a stored-file
/// reference, empty until the first upload.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub subject: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub resume: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: JobCategory,
    pub level: JobLevel,
    pub salary: i64,
    pub visible: bool,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
}

/// Job listing with its company attached, as returned by the public
/// endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct JobWithCompany {
    #[serde(flatten)]
    pub job: Job,
    pub company: CompanySummary,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "job_level")]
pub enum JobLevel {
    Entry,
    Mid,
    Senior,
    Lead,
    Manager,
}

impl JobLevel {
    pub const ALL: [Self; 5] =
        [Self::Entry, Self::Mid, Self::Senior, Self::Lead, Self::Manager];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Mid => "Mid",
            Self::Senior => "Senior",
            Self::Lead => "Lead",
            Self::Manager => "Manager",
        }
    }
}

impl std::str::FromStr for JobLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|level| level.as_str() == s).ok_or(())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "job_category")]
pub enum JobCategory {
    Programming,
    #[serde(rename = "Data Science")]
    #[sqlx(rename = "Data Science")]
    DataScience,
    Designing,
    Networking,
    Management,
    Marketing,
    Cybersecurity,
}

impl JobCategory {
    pub const ALL: [Self; 7] = [
        Self::Programming,
        Self::DataScience,
        Self::Designing,
        Self::Networking,
        Self::Management,
        Self::Marketing,
        Self::Cybersecurity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Programming => "Programming",
            Self::DataScience => "Data Science",
            Self::Designing => "Designing",
            Self::Networking => "Networking",
            Self::Management => "Management",
            Self::Marketing => "Marketing",
            Self::Cybersecurity => "Cybersecurity",
        }
    }
}

impl std::str::FromStr for JobCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(())
    }
}

/// One application to one job. `name` and `email` are always populated,
/// either from the profile at submission time or from the anonymous
/// form; `user_id` stays empty for anonymous applicants.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume: Option<String>,
    pub cover_letter: String,
    pub job_id: String,
    pub company_id: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Statuses are not a workflow: any status may replace any other, so a
/// reconsidered rejection can move straight back to accepted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [Self; 4] =
        [Self::Pending, Self::Reviewed, Self::Accepted, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

/// Recruiter dashboard row: a job with its application count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyJobRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub job: Job,
    pub application_count: i64,
}

/// Application joined with its job and, when present, the applicant
/// profile. Handlers turn this into the applicant-view payload.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyApplicationRow {
    #[sqlx(flatten)]
    pub application: Application,
    pub job_title: String,
    pub job_location: String,
    pub user_resume: Option<String>,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
    pub user_email: Option<String>,
}

/// Applicant dashboard row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserApplicationRow {
    pub id: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub job_title: String,
    pub job_location: String,
    pub job_salary: i64,
    pub company_name: String,
    pub company_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for category in JobCategory::ALL {
            assert_eq!(category.as_str().parse::<JobCategory>(), Ok(category));
        }
        assert_eq!("Data Science".parse::<JobCategory>(), Ok(JobCategory::DataScience));
        assert!("data science".parse::<JobCategory>().is_err());
    }

    #[test]
    fn status_labels_are_lowercase() {
        assert_eq!("accepted".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Accepted));
        assert!("Accepted".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn company_serialization_hides_credentials() {
        let company = Company {
            id: "c1".into(),
            name: "Acme".into(),
            email: "hr@acme.com".into(),
            password: "$argon2id$stub".into(),
            image: None,
            reset_token: Some("secret".into()),
            reset_expires: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&company).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("resetToken").is_none());
        assert_eq!(json["email"], "hr@acme.com");
    }
}

//! Configuration manager for jobport.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public base URL of this server, used to build absolute links.
    pub url: String,
    /// Base URL of the front end, used in password-reset links.
    pub frontend_url: Option<String>,
    /// Directory uploaded files are written to and served back from.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// When non-empty, only these emails may register or act as recruiters.
    #[serde(default)]
    pub allowed_company_emails: Vec<String>,
    #[serde(default)]
    pub(crate) version: String,
    #[serde(skip)]
    pub(crate) path: PathBuf,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to the external identity provider for applicants.
    #[serde(skip_serializing)]
    pub identity: Option<Identity>,
    /// Related to the remote object store for uploaded files.
    #[serde(skip_serializing)]
    pub storage: Option<RemoteStorageConfig>,
    /// Related to automatic mail sending.
    #[serde(skip_serializing)]
    pub mail: Option<Mail>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
}

fn default_uploads_dir() -> PathBuf {
    DEFAULT_UPLOADS_DIR.into()
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Identity provider key material. Either a PEM public key (RS256) or a
/// shared secret (HS256) must be present for applicant routes to work.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub issuer: Option<String>,
    pub public_key_pem: Option<String>,
    pub secret: Option<String>,
}

/// Remote object store the file intake forwards uploads to.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct RemoteStorageConfig {
    pub endpoint: String,
    pub key: String,
    pub secret: String,
}

/// Mail queue configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    /// Hostname:(?port) for RabbitMQ instance.
    pub address: String,
    /// RabbitMQ default vhost.
    pub vhost: Option<String>,
    /// RabbitMQ username to access queue.
    pub username: String,
    /// RabbitMQ password to access queue.
    pub password: String,
    /// Max channel connections.
    pub pool: Option<u16>,
    /// Queue name to send mailing events.
    pub queue: String,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Whether `email` may hold a recruiter account. An empty allow-list
    /// admits everyone.
    pub fn email_allowed(&self, email: &str) -> bool {
        if self.allowed_company_emails.is_empty() {
            return true;
        }

        let email = email.trim().to_lowercase();
        self.allowed_company_emails
            .iter()
            .any(|allowed| allowed.trim().to_lowercase() == email)
    }

    /// Base URL used in links sent to applicants and recruiters.
    pub fn front_url(&self) -> &str {
        self.frontend_url.as_deref().unwrap_or(&self.url)
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();

                // normalize URLs.
                config.url = self.normalize_url(&config.url)?;
                config.frontend_url = config
                    .frontend_url
                    .map(|f| self.normalize_url(&f))
                    .transpose()?;

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            uploads_dir: default_uploads_dir(),
            ..Default::default()
        }
    }
}

//! Jobport is a job-board REST API: recruiters post jobs and review
//! applicants, job seekers browse and apply with resumes.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod telemetry;

mod crypto;
mod identity;
mod mail;
mod middleware;
mod router;
mod token;
mod uploads;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use store::Storage;

/// Leaves headroom above the single-file upload limits.
const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub store: Arc<dyn Storage>,
    pub token: token::TokenManager,
    pub identity: identity::IdentityProvider,
    pub crypto: Arc<crypto::Crypto>,
    pub mail: mail::MailManager,
    pub files: Arc<uploads::FileIntake>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            HeaderName::from_static("token"),
        ]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        );

    Router::new()
        .nest("/api/jobs", router::jobs::router())
        .nest("/api/company", router::company::router())
        .nest("/api/users", router::users::router())
        // Serve stored uploads back under their reference paths.
        .nest_service(
            "/uploads",
            ServeDir::new(&state.config.uploads_dir),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
        .layer(middleware)
}

/// Select the storage backend once at startup: PostgreSQL when
/// configured and reachable, the process-local in-memory store
/// otherwise.
pub async fn select_store(
    postgres: Option<&config::Postgres>,
) -> Arc<dyn Storage> {
    match postgres {
        Some(postgres) => {
            match store::PostgresStore::connect(postgres).await {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "postgres unreachable, degrading to in-memory storage"
                    );
                    Arc::new(store::MemoryStore::new())
                },
            }
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, \
                 using in-memory storage"
            );
            Arc::new(store::MemoryStore::new())
        },
    }
}

/// Initialize the application state.
///
/// An unreachable database is not fatal: the process degrades to the
/// in-memory store and keeps serving. A missing token secret is fatal.
pub async fn initialize_state()
-> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let store = select_store(config.postgres.as_ref()).await;

    // handle recruiter jwt.
    let secret = std::env::var("JWT_SECRET")
        .expect("missing `JWT_SECRET` environnement variable");
    let token = token::TokenManager::new(&config.url, &secret);

    // handle applicant identity provider.
    let identity = match &config.identity {
        Some(cfg) => identity::IdentityProvider::new(cfg)?,
        None => {
            tracing::warn!(
                "missing `identity` entry on `config.yaml` file, \
                 applicant routes will reject every token"
            );
            identity::IdentityProvider::default()
        },
    };

    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone())?);

    // handle mail sender.
    let mail = if let Some(cfg) = &config.mail {
        mail::MailManager::new(cfg).await?
    } else {
        mail::MailManager::default()
    };

    // handle file intake, with optional remote object store.
    let remote = config
        .storage
        .as_ref()
        .map(uploads::RemoteStorage::new)
        .transpose()?;
    let files = Arc::new(uploads::FileIntake::new(
        config.uploads_dir.clone(),
        remote,
    ));

    Ok(AppState {
        config,
        store,
        token,
        identity,
        crypto,
        mail,
        files,
    })
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde::Serialize;
    use tower::util::ServiceExt;

    use super::*;

    pub(crate) const IDENTITY_SECRET: &str = "test-identity-secret";
    pub(crate) const TOKEN_SECRET: &str = "test-jwt-secret";
    const BOUNDARY: &str = "------------------------jobport-test";

    pub(crate) fn test_state_with(
        mut config: config::Configuration,
    ) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        config.uploads_dir = dir.path().to_path_buf();

        let identity_config = config::Identity {
            secret: Some(IDENTITY_SECRET.into()),
            ..Default::default()
        };
        let identity =
            identity::IdentityProvider::new(&identity_config).unwrap();
        config.identity = Some(identity_config);

        // Cheap hashing parameters, production tuning is irrelevant here.
        let crypto = Arc::new(
            crypto::Crypto::new(Some(config::Argon2 {
                memory_cost: 1024,
                iterations: 1,
                parallelism: 1,
            }))
            .unwrap(),
        );
        let files =
            Arc::new(uploads::FileIntake::new(dir.path().to_path_buf(), None));

        let state = AppState {
            config: Arc::new(config),
            store: Arc::new(store::MemoryStore::new()),
            token: token::TokenManager::new(
                "http://localhost:5000/",
                TOKEN_SECRET,
            ),
            identity,
            crypto,
            mail: mail::MailManager::default(),
            files,
        };
        (state, dir)
    }

    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        test_state_with(config::Configuration::default())
    }

    /// Bearer header value for an applicant subject, signed with the
    /// test identity secret.
    pub(crate) fn bearer(subject: &str) -> String {
        #[derive(Serialize)]
        struct Claims {
            sub: String,
            exp: u64,
        }

        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: subject.into(),
                exp,
            },
            &EncodingKey::from_secret(IDENTITY_SECRET.as_bytes()),
        )
        .unwrap();

        format!("Bearer {token}")
    }

    pub(crate) async fn make_request(
        app: Router,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Body,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response =
            app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes =
            response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or(serde_json::Value::Null)
        };

        (status, body)
    }

    /// Hand-rolled multipart body: text fields plus at most one file.
    pub(crate) fn multipart_body(
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &str, &[u8])>,
    ) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((field, filename, content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"{field}\"; filename=\"{filename}\"\r\n\
                     Content-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        (format!("multipart/form-data; boundary={BOUNDARY}"), body)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;

    use super::test_util::{make_request, test_state};
    use super::*;

    #[tokio::test]
    async fn unreachable_database_degrades_to_memory() {
        let postgres = config::Postgres {
            address: "127.0.0.1:1".into(),
            ..Default::default()
        };

        let store = select_store(Some(&postgres)).await;
        assert_eq!(store.backend(), "In-Memory");

        // The API keeps serving against the degraded store.
        let (mut state, _dir) = test_state();
        state.store = store;
        let (status, body) =
            make_request(app(state), "GET", "/api/jobs", &[], Body::empty())
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "In-Memory");
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn missing_database_config_uses_memory() {
        assert_eq!(select_store(None).await.backend(), "In-Memory");
    }
}

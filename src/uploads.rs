//! File intake for logos and resumes.
//!
//! Accepted files are first written to local disk under
//! `<field>-<millis>-<random><ext>`. When a remote object store is
//! configured the file is forwarded there and the remote URL becomes
//! the canonical reference; on remote failure the local path is kept
//! and the caller never sees an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use rand::Rng;
use reqwest::multipart::{Form as RemoteForm, Part};
use serde::Deserialize;
use url::Url;

use crate::config::RemoteStorageConfig;
use crate::error::{Result, ServerError};

const MB: usize = 1024 * 1024;
/// Company logos accept any content type up to 5MB.
pub const LOGO: Constraints = Constraints {
    limit: 5 * MB,
    pdf_only: false,
};
/// Resumes must be PDF; one 10MB limit applies to every resume path.
pub const RESUME: Constraints = Constraints {
    limit: 10 * MB,
    pdf_only: true,
};

const PDF_MIME: &str = "application/pdf";

#[derive(Clone, Copy)]
pub struct Constraints {
    pub limit: usize,
    pub pdf_only: bool,
}

/// One uploaded file pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Text fields plus at most one file from a multipart body.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl Form {
    /// Drain a multipart body into text fields and an optional file.
    pub async fn collect(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            if let Some(file_name) = field.file_name() {
                let file_name = file_name.to_owned();
                let content_type =
                    field.content_type().map(|ct| ct.to_owned());
                form.file = Some(FilePart {
                    field: name,
                    file_name,
                    content_type,
                    data: field.bytes().await?,
                });
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }

        Ok(form)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ServerError::Validation(format!("{key} is required"))
            })
    }
}

/// Canonical reference to a stored file: either a remote URL or a
/// local `/uploads/<filename>` path.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub reference: String,
}

/// Writes uploads to disk and optionally forwards them to the remote
/// object store.
pub struct FileIntake {
    dir: PathBuf,
    remote: Option<RemoteStorage>,
}

impl FileIntake {
    pub fn new(dir: PathBuf, remote: Option<RemoteStorage>) -> Self {
        Self { dir, remote }
    }

    /// Validate and persist one uploaded file.
    pub async fn store(
        &self,
        part: &FilePart,
        constraints: Constraints,
    ) -> Result<StoredFile> {
        if constraints.pdf_only
            && part.content_type.as_deref() != Some(PDF_MIME)
        {
            return Err(ServerError::Validation(
                "Only PDF files are allowed".into(),
            ));
        }
        if part.data.len() > constraints.limit {
            return Err(ServerError::Validation(format!(
                "File exceeds the {}MB limit",
                constraints.limit / MB
            )));
        }

        let filename = unique_filename(&part.field, &part.file_name);
        let path = self.dir.join(&filename);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &part.data).await?;

        if let Some(remote) = &self.remote {
            match remote.upload(&filename, part).await {
                Ok(url) => {
                    if let Err(err) = tokio::fs::remove_file(&path).await {
                        tracing::debug!(error = %err, "temp file not removed");
                    }
                    return Ok(StoredFile { reference: url });
                },
                Err(err) => {
                    // Swallowed on purpose: availability over strict
                    // correctness. The event lets operators detect
                    // silent drift to local disk.
                    tracing::warn!(
                        target: "jobport::uploads",
                        event = "remote_upload_fallback",
                        %filename,
                        error = %err,
                        "remote upload failed, keeping local file"
                    );
                },
            }
        }

        Ok(StoredFile {
            reference: format!("/uploads/{filename}"),
        })
    }
}

/// Collision probability treated as negligible.
fn unique_filename(field: &str, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();

    format!("{field}-{millis}-{random}{ext}")
}

/// Remote object-store client.
pub struct RemoteStorage {
    endpoint: Url,
    key: String,
    secret: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl RemoteStorage {
    pub fn new(
        config: &RemoteStorageConfig,
    ) -> std::result::Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(&config.endpoint)?,
            key: config.key.clone(),
            secret: config.secret.clone(),
            http: reqwest::Client::new(),
        })
    }

    async fn upload(
        &self,
        filename: &str,
        part: &FilePart,
    ) -> std::result::Result<String, reqwest::Error> {
        let mut file_part = Part::bytes(part.data.to_vec())
            .file_name(filename.to_owned());
        if let Some(content_type) = &part.content_type {
            if let Ok(with_mime) =
                Part::bytes(part.data.to_vec())
                    .file_name(filename.to_owned())
                    .mime_str(content_type)
            {
                file_part = with_mime;
            }
        }
        let form = RemoteForm::new().part("file", file_part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.key, Some(&self.secret))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<UploadResponse>().await?.url)
    }
}

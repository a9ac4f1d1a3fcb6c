//! Error handler for jobport.
//!
//! Every handler failure is translated into the JSON envelope
//! `{"success": false, "message": ...}` expected by the front end.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fields(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("{0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate resource rejected with 400, e.g. a second application
    /// to the same job.
    #[error("{0}")]
    Duplicate(String),

    /// Conflicting resource rejected with 409; `existing_id` lets the
    /// client start the email conflict-resolution flow.
    #[error("{message}")]
    Conflict {
        message: String,
        existing_id: Option<String>,
    },

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Lapin(#[from] lapin::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal server error, {0}")]
    Internal(String),
}

/// Response body for every failed request.
#[derive(Debug, Serialize)]
struct ResponseError {
    success: bool,
    message: String,
    #[serde(rename = "existingUserId", skip_serializing_if = "Option::is_none")]
    existing_user_id: Option<String>,
}

impl ResponseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            existing_user_id: None,
        }
    }
}

fn field_errors_message(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| format!("{field}: {issue}"))
        })
        .collect();
    parts.sort();

    if parts.is_empty() {
        "validation error occurred".to_owned()
    } else {
        parts.join("; ")
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Validation(message)
            | ServerError::Duplicate(message) => {
                (StatusCode::BAD_REQUEST, ResponseError::new(message))
            }

            ServerError::Fields(errors) => (
                StatusCode::BAD_REQUEST,
                ResponseError::new(field_errors_message(errors)),
            ),

            ServerError::Axum(rejection) => (
                StatusCode::BAD_REQUEST,
                ResponseError::new(rejection.body_text()),
            ),

            ServerError::Multipart(err) => {
                (StatusCode::BAD_REQUEST, ResponseError::new(err.body_text()))
            }

            ServerError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ResponseError::new(message))
            }

            ServerError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, ResponseError::new(message))
            }

            ServerError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ResponseError::new(message))
            }

            ServerError::Conflict {
                message,
                existing_id,
            } => (
                StatusCode::CONFLICT,
                ResponseError {
                    success: false,
                    message: message.clone(),
                    existing_user_id: existing_id.clone(),
                },
            ),

            // Unexpected errors: message only, details stay in the logs.
            _ => {
                tracing::error!(error = %self, "server returned 500 status");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ResponseError::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

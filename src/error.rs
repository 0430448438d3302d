use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Which external collaborator produced an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Jikan,
    Backend,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::Jikan => f.write_str("jikan"),
            Upstream::Backend => f.write_str("backend"),
        }
    }
}

#[derive(Debug, ThisError)]
pub enum AnidexError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream rate limited; retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("{service} responded with status {status}")]
    UpstreamStatus {
        service: Upstream,
        status: StatusCode,
    },

    #[error("Genre not found: {0}")]
    GenreNotFound(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Login required")]
    LoginRequired,

    #[error("Invalid or missing admin key")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<figment::Error> for AnidexError {
    fn from(e: figment::Error) -> Self {
        AnidexError::Config(Box::new(e))
    }
}

/// Decides whether a failed upstream call may be attempted again.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for AnidexError {
    fn is_retryable(&self) -> bool {
        matches!(self, AnidexError::RateLimited { .. })
    }
}

impl AnidexError {
    /// The delay the upstream asked for, when this is a rate-limit failure.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AnidexError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AnidexError::UpstreamStatus {
                status: StatusCode::NOT_FOUND,
                ..
            }
        )
    }
}

impl IntoResponse for AnidexError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            AnidexError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT",
                "We're loading data too quickly. Please wait a moment and try again.".to_string(),
            ),
            AnidexError::LoginRequired => (
                StatusCode::UNAUTHORIZED,
                "LOGIN_REQUIRED",
                "Please login to continue.".to_string(),
            ),
            AnidexError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid or missing key.".to_string(),
            ),
            AnidexError::GenreNotFound(name) => (
                StatusCode::NOT_FOUND,
                "GENRE_NOT_FOUND",
                format!("Genre not found: {name}"),
            ),
            AnidexError::EntryNotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {what}"),
            ),
            AnidexError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone())
            }
            AnidexError::UpstreamStatus { status, .. } => match *status {
                StatusCode::NOT_FOUND => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Upstream resource not found.".to_string(),
                ),
                StatusCode::TOO_MANY_REQUESTS => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT",
                    "Upstream rate limit exceeded.".to_string(),
                ),
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "An upstream error occurred.".to_string(),
                ),
            },
            AnidexError::Reqwest(_) | AnidexError::UrlParse(_) | AnidexError::Json(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            AnidexError::DatabaseError(_) | AnidexError::Config(_) | AnidexError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

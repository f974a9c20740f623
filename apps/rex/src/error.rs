//! Application error type and its HTTP mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rex_core::RexError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the server and the CLI.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Rex(#[from] RexError),

    #[error("authentication required")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Rex(RexError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Rex(RexError::Forbidden(_)) => StatusCode::FORBIDDEN,
            AppError::Rex(RexError::InvalidInput(_))
            | AppError::InvalidArgument(_)
            | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Rex(RexError::Storage(_) | RexError::Format(_))
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Join(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::BAD_REQUEST => "invalid_input",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            _ => "internal",
        }
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        AppError::Internal(format!("{} lock poisoned", what))
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else if matches!(status, StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED) {
            warn!(error = %self, "request denied");
        }

        // Internal details stay in the log
        let message = if status.is_server_error() {
            String::from("internal server error")
        } else {
            self.to_string()
        };
        let body = Json(ErrorBody {
            code: self.code(),
            message,
        });

        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"rex\"")],
                body,
            )
                .into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

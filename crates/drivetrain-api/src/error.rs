use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use drivetrain_core::util::sanitize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("External dependency error: {0}")]
    External(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<drivetrain_core::Error> for AppError {
    fn from(error: drivetrain_core::Error) -> Self {
        use drivetrain_core::Error as CoreError;

        match error {
            CoreError::InvalidInput(message) => Self::BadRequest(message),
            error if error.is_store_failure() => {
                tracing::error!(error = %sanitize(&error), "Record store failure");
                Self::Internal("record store unavailable".to_string())
            }
            error @ (CoreError::Http(_)
            | CoreError::Upstream { .. }
            | CoreError::Auth(_)
            | CoreError::NotFound(_)
            | CoreError::Timeout(_)
            | CoreError::ArtifactFailed(_)) => Self::External(sanitize(&error)),
            error => Self::Internal(sanitize(&error)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

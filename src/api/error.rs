//! Mapping of failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clusterwatch_core::PollError;
use clusterwatch_types::ValidationError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The body was not a well-formed registration.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Poll(#[from] PollError),

    /// The registry could not be written.
    #[error("failed to save changes: {0:#}")]
    Persistence(anyhow::Error),

    #[error("{0}")]
    Unauthorized(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Poll(PollError::NotFound(_)) | ApiError::Poll(PollError::NoDataYet(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Poll(PollError::AlreadyStarted) | ApiError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code, so clients can tell the two 404s apart.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_failed",
            ApiError::Poll(PollError::NotFound(_)) => "not_found",
            ApiError::Poll(PollError::NoDataYet(_)) => "no_data_yet",
            ApiError::Poll(PollError::AlreadyStarted) => "internal",
            ApiError::Persistence(_) => "persistence_failed",
            ApiError::Unauthorized(_) => "unauthorized",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Validation(err) => json!({
                "error": "validation failed",
                "code": self.code(),
                "details": err.to_string(),
            }),
            ApiError::Persistence(err) => {
                error!(error = %format!("{:#}", err), "Failed to persist registry");
                json!({
                    "error": "failed to save changes",
                    "code": self.code(),
                    "details": format!("{:#}", err),
                })
            }
            _ => json!({
                "error": self.to_string(),
                "code": self.code(),
            }),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_no_data_are_distinguishable() {
        let missing = ApiError::from(PollError::NotFound("prod".into()));
        let pending = ApiError::from(PollError::NoDataYet("prod".into()));

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(pending.status(), StatusCode::NOT_FOUND);
        assert_ne!(missing.code(), pending.code());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::MissingField("name")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Persistence(anyhow::anyhow!("disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Unauthorized("Invalid API key").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_unauthorized_message_is_verbatim() {
        assert_eq!(
            ApiError::Unauthorized("API key is required").to_string(),
            "API key is required"
        );
    }
}

//! Error handling for the HTTP layer

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::response::Envelope;

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {}", .details.join(", "))]
    Validation {
        message: String,
        details: Vec<String>,
    },

    #[error("conflict: {message}")]
    Conflict { message: String, error: String },

    #[error("not found: {message}")]
    NotFound { message: String, error: String },

    #[error("bad request: {message}")]
    BadRequest { message: String, error: String },

    #[error("{message}: {source}")]
    Internal {
        message: String,
        source: anyhow::Error,
    },
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>, error: impl ToString) -> Self {
        Self::Conflict {
            message: message.into(),
            error: error.to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>, error: impl ToString) -> Self {
        Self::NotFound {
            message: message.into(),
            error: error.to_string(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>, error: impl ToString) -> Self {
        Self::BadRequest {
            message: message.into(),
            error: error.to_string(),
        }
    }

    /// Create an internal error with a human-readable summary
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(source: anyhow::Error) -> Self {
        Self::internal("Internal server error", source)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(vec![rejection.body_text()], "Validation failed")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, error) = match self {
            AppError::Validation { message, details } => (message, details.join(", ")),
            AppError::Conflict { message, error }
            | AppError::NotFound { message, error }
            | AppError::BadRequest { message, error } => (message, error),
            AppError::Internal { message, source } => {
                let error_id = Uuid::now_v7();
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = %format!("{source:#}"),
                    "{message}"
                );
                (message, format!("{source:#}"))
            }
        };

        if !status.is_server_error() {
            tracing::debug!(status_code = %status.as_u16(), %message, "request rejected");
        }

        (status, Json(Envelope::failure(message, error))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_error() {
        let details = vec!["title is required".to_string()];
        let error = AppError::validation(details.clone(), "Validation failed");

        match error {
            AppError::Validation { details: d, message } => {
                assert_eq!(d, details);
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::not_found("Book not found", "book not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("duplicate", "isbn taken").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::bad_request("Invalid book ID", "abc").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("connection refused")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_envelope_format() {
        let response =
            AppError::not_found("Book not found", "book not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({
                "success": false,
                "message": "Book not found",
                "error": "book not found"
            })
        );
    }

    #[tokio::test]
    async fn test_validation_details_are_joined() {
        let response = AppError::validation(
            vec![
                "title is required".to_string(),
                "isbn must be at least 10 characters long".to_string(),
            ],
            "Validation failed",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "title is required, isbn must be at least 10 characters long"
        );
    }

    #[tokio::test]
    async fn test_internal_error_keeps_underlying_text() {
        let response = AppError::internal(
            "Failed to fetch books",
            anyhow::anyhow!("pool timed out"),
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Failed to fetch books");
        assert_eq!(body["error"], "pool timed out");
    }
}

//! Error responses for the HTTP API
//!
//! Every handler returns `Result<_, ApiError>`. Store and upload failures are
//! logged with their full source error, but the client only ever sees a fixed
//! per-operation message such as "Failed to fetch course".

use axum::{
    extract::rejection::JsonRejection,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;
use crate::model::ValidationError;
use crate::upload::UploadError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Requested id is absent (404)
    #[error("{0}")]
    NotFound(&'static str),

    /// Payload failed boundary validation (400)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Any store operation failed (500)
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    /// Object storage rejected or could not receive the upload (502)
    #[error("{message}")]
    Upload {
        message: &'static str,
        #[source]
        source: UploadError,
    },
}

impl ApiError {
    pub fn store(message: &'static str, source: StoreError) -> Self {
        ApiError::Store { message, source }
    }

    pub fn upload(message: &'static str, source: UploadError) -> Self {
        ApiError::Upload { message, source }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Validation(err.body_text())
    }
}

/// Attaches the client-facing message to a store result
pub trait StoreResultExt<T> {
    fn or_fail(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn or_fail(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::store(message, source))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.to_string()),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed", self.to_string()),
            ApiError::Store { message, source } => {
                tracing::error!(error = %source, "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message.to_string())
            }
            ApiError::Upload { message, source } => {
                tracing::error!(error = %source, "{}", message);
                (StatusCode::BAD_GATEWAY, "upload_failed", message.to_string())
            }
        };

        (
            status,
            Json(json!({
                "error": message,
                "code": code
            })),
        )
            .into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_failure_hides_source_behind_fixed_message() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let detail = source.to_string();

        let response = ApiError::store("Failed to fetch course", StoreError::Codec(source)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "error": "Failed to fetch course", "code": "internal_error" })
        );
        assert!(!String::from_utf8_lossy(&bytes).contains(&detail));
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("Course not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_message_names_the_field() {
        let err: ApiError = ValidationError {
            field: "title",
            reason: "must not be empty",
        }
        .into();
        assert_eq!(err.to_string(), "Invalid request: title must not be empty");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

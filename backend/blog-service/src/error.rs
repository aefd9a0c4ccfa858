//! Error types for blog-service
//!
//! Every failure a caller can observe is one of the variants below and is
//! rendered as a structured JSON body carrying a machine-readable `reason`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a request was rejected as invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// The actor tried to follow themselves
    SelfFollow,
    /// The (follower, following) pair already exists
    DuplicateFollow,
    /// A required field was absent or blank
    MissingField(String),
    /// A field names a group, post or user that does not exist
    InvalidReference(String),
    /// The image payload could not be decoded or is not an image
    InvalidImage,
    /// The request body could not be parsed
    MalformedBody,
}

impl ValidationReason {
    /// Machine-readable reason string carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationReason::SelfFollow => "self-follow",
            ValidationReason::DuplicateFollow => "duplicate-follow",
            ValidationReason::MissingField(_) => "missing-field",
            ValidationReason::InvalidReference(_) => "invalid-reference",
            ValidationReason::InvalidImage => "invalid-image",
            ValidationReason::MalformedBody => "malformed-body",
        }
    }

    /// Field the reason refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationReason::MissingField(field) | ValidationReason::InvalidReference(field) => {
                Some(field)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => write!(f, "{} ({})", self.code(), field),
            None => f.write_str(self.code()),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("not permitted")]
    Forbidden,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(ValidationReason),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(reason: ValidationReason) -> Self {
        AppError::Validation(reason)
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        AppError::Validation(ValidationReason::MissingField(field.into()))
    }

    pub fn invalid_reference(field: impl Into<String>) -> Self {
        AppError::Validation(ValidationReason::InvalidReference(field.into()))
    }

    /// Machine-readable reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not-found",
            AppError::Validation(reason) => reason.code(),
            AppError::MethodNotAllowed => "method-not-allowed",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }

    /// Human-readable summary; never leaks backend details.
    fn public_message(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "authentication required",
            AppError::Forbidden => "not permitted",
            AppError::NotFound(_) => "resource not found",
            AppError::Validation(_) => "invalid request",
            AppError::MethodNotAllowed => "method not allowed",
            AppError::Database(_) | AppError::Internal(_) => "internal error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = serde_json::json!({
            "error": self.public_message(),
            "reason": self.reason(),
            "status": status.as_u16(),
        });
        if let AppError::Validation(reason) = self {
            if let Some(field) = reason.field() {
                body["field"] = serde_json::Value::from(field);
            }
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what.to_string()),
            StoreError::DuplicateEdge => AppError::Validation(ValidationReason::DuplicateFollow),
            StoreError::SelfFollow => AppError::Validation(ValidationReason::SelfFollow),
            StoreError::InvalidReference(field) => AppError::invalid_reference(field),
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .into_keys()
            .min()
            .map(|field| field.to_string())
            .unwrap_or_else(|| "body".to_string());
        AppError::missing_field(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: AppError) -> serde_json::Value {
        let resp = err.error_response();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_classes() {
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("post".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation(ValidationReason::SelfFollow).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn validation_body_carries_reason_and_field() {
        let body = body_of(AppError::missing_field("text")).await;
        assert_eq!(body["error"], "invalid request");
        assert_eq!(body["reason"], "missing-field");
        assert_eq!(body["field"], "text");
        assert_eq!(body["status"], 400);
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let body = body_of(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(body["error"], "internal error");
        assert!(!body.to_string().contains("pool exhausted"));
    }

    #[test]
    fn store_errors_map_to_validation_reasons() {
        let err: AppError = StoreError::DuplicateEdge.into();
        assert_eq!(err.reason(), "duplicate-follow");
        let err: AppError = StoreError::SelfFollow.into();
        assert_eq!(err.reason(), "self-follow");
        let err: AppError = StoreError::InvalidReference("group").into();
        assert_eq!(err.reason(), "invalid-reference");
    }
}

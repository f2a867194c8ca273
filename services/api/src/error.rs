//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    identity::IdentityError,
    ownership::OwnershipError,
    repositories::{ReferenceError, UsernameChangeError},
    storage::StorageError,
};

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credential
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not the owner of the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload body over the configured limit
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl ApiError {
    /// Log a downstream failure and collapse it into a 500
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", context, err);
        ApiError::InternalServerError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::Unauthorized => "Missing or invalid token".to_string(),
            ApiError::Forbidden(msg) | ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::PayloadTooLarge => "Upload exceeds the size limit".to_string(),
            ApiError::InternalServerError => "Internal server error".to_string(),
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                "Database error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<OwnershipError> for ApiError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::NotFound(resource) => {
                ApiError::NotFound(format!("{} not found", resource.title()))
            }
            OwnershipError::Forbidden(resource) => ApiError::Forbidden(format!(
                "Not authorized to modify this {}",
                resource.noun()
            )),
            OwnershipError::Database(e) => ApiError::internal("Ownership-gated mutation failed", e),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<UsernameChangeError> for ApiError {
    fn from(err: UsernameChangeError) -> Self {
        match err {
            UsernameChangeError::NotFound => ApiError::NotFound("User not found".to_string()),
            UsernameChangeError::TooSoon { next_allowed } => ApiError::BadRequest(format!(
                "Username can only be changed once every {} days; next change allowed after {}",
                crate::models::user::USERNAME_CHANGE_COOLDOWN_DAYS,
                next_allowed.to_rfc3339()
            )),
            UsernameChangeError::Taken => ApiError::BadRequest("Username already taken".to_string()),
            UsernameChangeError::Database(e) => ApiError::internal("Username change failed", e),
        }
    }
}

impl From<ReferenceError> for ApiError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::Missing(missing) => {
                ApiError::NotFound(format!("{} not found", missing.title()))
            }
            ReferenceError::Database(e) => ApiError::internal("Insert failed", e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownBucket(_)
            | StorageError::UnsupportedContentType(_)
            | StorageError::EmptyBody => ApiError::BadRequest(err.to_string()),
            StorageError::Backend(e) => ApiError::internal("Object storage failure", e),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(message) => ApiError::BadRequest(message),
            IdentityError::Transport(e) => ApiError::internal("Identity provider unreachable", e),
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

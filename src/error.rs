use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Identity verification failures raised by the token codec.
///
/// All four surface to the caller as 401; the variant is kept for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,
    #[error("token could not be parsed")]
    MalformedToken,
    #[error("token signature or algorithm is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
}

/// Failures reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return StoreError::InvalidReference(db.message().to_string());
            }
        }
        StoreError::Unexpected(anyhow::Error::new(err))
    }
}

/// AppError
///
/// The typed failure every operation returns. Mapping to HTTP happens only in `IntoResponse`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("not permitted")]
    Unauthorized,

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email or password is incorrect")]
    InvalidCredentials,

    #[error("not found")]
    NotFound,

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound,
            StoreError::Conflict(detail) => AppError::Duplicate(detail),
            StoreError::InvalidReference(detail) => AppError::Validation(detail),
            StoreError::Unexpected(err) => AppError::Internal(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl AppError {
    /// Wire-level status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidPagination(_)
            | AppError::Validation(_)
            | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) | AppError::Unauthorized => "unauthorized",
            AppError::InvalidPagination(_) | AppError::Validation(_) => "bad_request",
            AppError::InvalidCredentials => "bad_request",
            AppError::NotFound => "not_found",
            AppError::Duplicate(_) => "duplicate",
            AppError::Internal(_) => "server_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Auth(_) | AppError::Unauthorized => {
                "Unauthorized, please login or use different role".to_string()
            }
            AppError::InvalidPagination(detail) => format!("Invalid pagination: {detail}"),
            AppError::Validation(detail) => format!("Invalid parameters or payload: {detail}"),
            AppError::InvalidCredentials => "Email or password is incorrect".to_string(),
            AppError::NotFound => "Data not found".to_string(),
            AppError::Duplicate(_) => "Created value already exists".to_string(),
            AppError::Internal(_) => "Something bad happened".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorMeta {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    meta: ErrorMeta,
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(err) => tracing::error!("internal error: {:?}", err),
            AppError::Auth(kind) => tracing::debug!("identity rejected: {}", kind),
            other => tracing::debug!("request failed: {}", other),
        }

        let body = ErrorBody {
            meta: ErrorMeta {
                success: false,
                message: self.public_message(),
            },
            error: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

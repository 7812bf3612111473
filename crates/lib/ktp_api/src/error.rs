//! Application error types.

use axum::extract::rejection::JsonRejection;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ktp_core::auth::AuthError;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(m)
            | AppError::Conflict(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m) => m,
            AppError::Internal(detail) => {
                error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
        };
        let body = Json(ErrorResponse {
            status: if status.is_server_error() { "error" } else { "fail" },
            message,
        });
        (status, body).into_response()
    }
}

const INVALID_TOKEN: &str = "Invalid or expired token";

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(msg) => AppError::Validation(msg),
            AuthError::MissingFields(_) => AppError::Validation(e.to_string()),
            AuthError::EmailTaken => AppError::Conflict(e.to_string()),
            AuthError::InvalidCredentials => AppError::Unauthorized(e.to_string()),
            AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::Unauthorized
            | AuthError::RefreshTokenNotFound
            | AuthError::RefreshTokenRevoked
            | AuthError::RefreshTokenExpired => {
                debug!(cause = %e, "token rejected");
                AppError::Unauthorized(INVALID_TOKEN.into())
            }
            AuthError::InvalidOrExpiredToken => AppError::Validation(e.to_string()),
            AuthError::UserNotFound => AppError::NotFound(e.to_string()),
            AuthError::NotPermitted(msg) => AppError::Validation(msg.into()),
            AuthError::MailDelivery(mail) => {
                warn!(error = %mail, "mail delivery failed");
                AppError::Internal(format!("mail delivery: {mail}"))
            }
            AuthError::Store(store) => AppError::Internal(format!("store: {store}")),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

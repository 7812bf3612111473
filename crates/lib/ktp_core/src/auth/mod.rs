//! Authentication and session logic.
//!
//! Password hashing, access-token signing, refresh-token issuance and the
//! password-reset lifecycle, composed by [`service::AuthService`].

pub mod jwt;
pub mod password;
pub mod refresh;
pub mod reset;
pub mod service;
pub mod tokens;

use thiserror::Error;

use crate::mail::MailError;
use crate::store::StoreError;

/// Authentication errors. One variant per distinct failure; the HTTP layer
/// decides how much of the distinction reaches the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Please provide {0}")]
    MissingFields(&'static str),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access token expired")]
    TokenExpired,

    #[error("Access token invalid")]
    TokenInvalid,

    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    #[error("Refresh token revoked")]
    RefreshTokenRevoked,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Token is invalid or has expired")]
    InvalidOrExpiredToken,

    #[error("The user belonging to this token no longer exists")]
    Unauthorized,

    #[error("User not found")]
    UserNotFound,

    /// A well-formed request that the account rules forbid, such as deleting
    /// the last admin.
    #[error("{0}")]
    NotPermitted(&'static str),

    #[error("Mail delivery failed: {0}")]
    MailDelivery(#[from] MailError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::EmailTaken,
            other => AuthError::Store(other),
        }
    }
}

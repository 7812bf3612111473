//! Password hashing via bcrypt, off the async executor.

use tokio::task;

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Lowest cost the configuration accepts.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Salted, slow password hashing.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password. Two calls on the same input give different hashes.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".into()));
        }
        let password = password.to_owned();
        let cost = self.cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a bcrypt hash.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".into()));
        }
        let password = password.to_owned();
        let hash = hash.to_owned();
        task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
            .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }
}

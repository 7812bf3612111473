//! Opaque secrets shared by refresh tokens and password resets.

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};

use super::AuthError;

/// Length of every opaque secret handed to a client.
pub const SECRET_LEN: usize = 64;

/// Generate a random secret (64 alphanumeric chars from the thread CSPRNG).
pub fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of a secret. Only this form is ever persisted.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `now + ttl`, or `Internal` when the instant falls outside chrono's range.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal(format!("expiry overflows: now {now} + {ttl}")))
}

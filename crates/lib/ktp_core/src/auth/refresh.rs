//! Refresh-token issuance, redemption and revocation.
//!
//! Tokens are opaque random strings; the store only ever sees their SHA-256
//! hash. Redeeming does not rotate or otherwise touch the record.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::tokens::{expiry_after, generate_secret, hash_secret};
use crate::clock::Clock;
use crate::models::auth::{IssuedRefreshToken, RefreshTokenRecord};
use crate::store::{RefreshTokenStore, StoreError};

/// Attempts before giving up on a hash collision. With 64 alphanumeric
/// characters a second attempt is already astronomically unlikely.
const INSERT_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct RefreshTokens {
    store: Arc<dyn RefreshTokenStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RefreshTokens {
    pub fn new(store: Arc<dyn RefreshTokenStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    /// Mint and persist a new refresh token for `user_id`.
    pub async fn issue(&self, user_id: Uuid) -> Result<IssuedRefreshToken, AuthError> {
        for _ in 0..INSERT_ATTEMPTS {
            let token = generate_secret();
            let now = self.clock.now();
            let expires_at = expiry_after(now, self.ttl)?;
            let record = RefreshTokenRecord {
                // v7 so sweeps and per-user scans read in issue order.
                id: Uuid::now_v7(),
                user_id,
                token_hash: hash_secret(&token),
                expires_at,
                revoked: false,
                created_at: now,
            };
            match self.store.insert(record).await {
                Ok(()) => return Ok(IssuedRefreshToken { token, expires_at }),
                Err(StoreError::DuplicateToken) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::Internal("could not mint a unique refresh token".into()))
    }

    /// Resolve a refresh token to its user. Checks existence, then
    /// revocation, then expiry.
    pub async fn redeem(&self, token: &str) -> Result<Uuid, AuthError> {
        let record = self
            .store
            .find_by_hash(&hash_secret(token))
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;
        if record.revoked {
            return Err(AuthError::RefreshTokenRevoked);
        }
        if record.expires_at <= self.clock.now() {
            return Err(AuthError::RefreshTokenExpired);
        }
        Ok(record.user_id)
    }

    /// Mark a token revoked. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let found = self.store.revoke_by_hash(&hash_secret(token)).await?;
        if !found {
            debug!("logout with unknown refresh token");
        }
        Ok(())
    }

    /// Revoke every live token of a user.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        Ok(self.store.revoke_all_for_user(user_id).await?)
    }

    /// Drop every token of a user.
    pub async fn forget_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
        Ok(self.store.delete_for_user(user_id).await?)
    }

    /// Delete records whose expiry has passed.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.store.purge_expired(self.clock.now()).await?)
    }
}

//! Persistence seams for users and refresh tokens.
//!
//! The auth core only talks to these traits. `postgres` backs them with sqlx;
//! `memory` keeps everything in process for tests and database-less local runs.
//! Reset consumption is one conditional update in both.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::RefreshTokenRecord;
use crate::models::user::{NewUser, ProfileUpdate, Role, RoleCounts, User, UserRecord};

pub use memory::{MemoryRefreshTokenStore, MemoryUserStore};
pub use postgres::{PgRefreshTokenStore, PgUserStore, migrate};

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Refresh token already exists")]
    DuplicateToken,

    #[error("Invalid stored value: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Credential store: the user collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user created at `now`. Fails with `DuplicateEmail` if the
    /// email is taken.
    async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> StoreResult<User>;

    /// Look up by normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// All users, oldest first.
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Apply a profile update. `Ok(None)` when the user does not exist;
    /// `DuplicateEmail` when the new email belongs to someone else.
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    async fn set_role(&self, id: Uuid, role: Role, now: DateTime<Utc>)
    -> StoreResult<Option<User>>;

    /// Returns `true` if a row was removed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn count_by_role(&self) -> StoreResult<RoleCounts>;

    /// Store a pending reset, replacing any previous one for this user.
    async fn set_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Clear the pending reset only if it still carries `token_hash`.
    async fn clear_reset(&self, id: Uuid, token_hash: &str) -> StoreResult<bool>;

    /// Atomically: find the user whose reset hash is `token_hash` and whose
    /// reset has not expired at `now`, set `new_password_hash`, and clear both
    /// reset fields. `Ok(None)` when nothing matched.
    async fn consume_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> StoreResult<Option<User>>;
}

/// Refresh-token persistence.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> StoreResult<()>;

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Mark revoked. Returns `true` if a record with this hash exists.
    async fn revoke_by_hash(&self, token_hash: &str) -> StoreResult<bool>;

    /// Revoke every live token of a user. Returns the number touched.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Drop every token of a user (account deletion).
    async fn delete_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Delete records whose expiry is at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

//! PostgreSQL-backed stores.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use tracing::debug;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, StoreResult, UserStore};
use crate::models::auth::RefreshTokenRecord;
use crate::models::user::{Avatar, NewUser, ProfileUpdate, Role, RoleCounts, User, UserRecord};

/// Apply the schema under `ktp_core/migrations/`. Already-applied versions
/// are skipped.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    debug!(available = migrator.iter().count(), "applying schema migrations");
    migrator.run(pool).await
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar_url, avatar_storage_id, \
     reset_token_hash, reset_expires_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    avatar_url: Option<String>,
    avatar_storage_id: Option<String>,
    reset_token_hash: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).map_err(|e| StoreError::Decode(e.to_string()))?;
        let avatar = match (row.avatar_url, row.avatar_storage_id) {
            (Some(url), Some(storage_id)) => Some(Avatar { url, storage_id }),
            _ => None,
        };
        Ok(UserRecord {
            user: User {
                id: row.id,
                name: row.name,
                email: row.email,
                role,
                avatar,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password_hash: row.password_hash,
            reset_token_hash: row.reset_token_hash,
            reset_expires_at: row.reset_expires_at,
        })
    }
}

fn into_user(row: UserRow) -> StoreResult<User> {
    UserRecord::try_from(row).map(|r| r.user)
}

/// Map a unique-constraint violation to `on_unique`, everything else to `Db`.
fn map_unique(e: sqlx::Error, on_unique: StoreError) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => on_unique,
        _ => StoreError::Db(e),
    }
}

/// Users table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateEmail))?;
        into_user(row)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(into_user).collect()
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             updated_at = $4 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateEmail))?;
        row.map(into_user).transpose()
    }

    async fn set_role(
        &self,
        id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(into_user).transpose()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_role(&self) -> StoreResult<RoleCounts> {
        let (total, admins, moderators, users) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE role = 'admin'), \
                    COUNT(*) FILTER (WHERE role = 'moderator'), \
                    COUNT(*) FILTER (WHERE role = 'user') \
             FROM users",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(RoleCounts {
            total: total as u64,
            admins: admins as u64,
            moderators: moderators as u64,
            users: users as u64,
        })
    }

    async fn set_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_reset(&self, id: Uuid, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET reset_token_hash = NULL, reset_expires_at = NULL \
             WHERE id = $1 AND reset_token_hash = $2",
        )
        .bind(id)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn consume_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> StoreResult<Option<User>> {
        // Single statement: the WHERE clause is the compare, the SET is the swap.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET password_hash = $3, reset_token_hash = NULL, \
                    reset_expires_at = NULL, updated_at = $2 \
             WHERE reset_token_hash = $1 AND reset_expires_at > $2 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token_hash)
        .bind(now)
        .bind(new_password_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(into_user).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            revoked: row.revoked,
            created_at: row.created_at,
        }
    }
}

/// Refresh tokens table.
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateToken))?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at \
             FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true WHERE user_id = $1 AND revoked = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

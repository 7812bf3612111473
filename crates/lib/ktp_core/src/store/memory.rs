//! In-process stores. Each store sits behind a single `RwLock`, so every
//! check-then-write below happens under one write guard.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, StoreResult, UserStore};
use crate::models::auth::RefreshTokenRecord;
use crate::models::user::{NewUser, ProfileUpdate, Role, RoleCounts, User, UserRecord};

/// In-memory user collection.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|r| r.user.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            avatar: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new_user.password_hash,
                reset_token_hash: None,
                reset_expires_at: None,
            },
        );
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.values().find(|r| r.user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().map(|r| r.user.clone()).collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        if let Some(email) = &update.email
            && users.values().any(|r| r.user.id != id && &r.user.email == email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let Some(record) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            record.user.name = name;
        }
        if let Some(email) = update.email {
            record.user.email = email;
        }
        record.user.updated_at = now;
        Ok(Some(record.user.clone()))
    }

    async fn set_role(
        &self,
        id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|record| {
            record.user.role = role;
            record.user.updated_at = now;
            record.user.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn count_by_role(&self) -> StoreResult<RoleCounts> {
        let users = self.users.read().await;
        let mut counts = RoleCounts::default();
        for record in users.values() {
            counts.total += 1;
            match record.user.role {
                Role::Admin => counts.admins += 1,
                Role::Moderator => counts.moderators += 1,
                Role::User => counts.users += 1,
            }
        }
        Ok(counts)
    }

    async fn set_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(record) => {
                record.reset_token_hash = Some(token_hash.to_string());
                record.reset_expires_at = Some(expires_at);
                true
            }
            None => false,
        })
    }

    async fn clear_reset(&self, id: Uuid, token_hash: &str) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(record) if record.reset_token_hash.as_deref() == Some(token_hash) => {
                record.reset_token_hash = None;
                record.reset_expires_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn consume_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        let matched = users.values_mut().find(|r| {
            r.reset_token_hash.as_deref() == Some(token_hash)
                && r.reset_expires_at.is_some_and(|exp| exp > now)
        });
        Ok(matched.map(|record| {
            record.password_hash = new_password_hash.to_string();
            record.reset_token_hash = None;
            record.reset_expires_at = None;
            record.user.updated_at = now;
            record.user.clone()
        }))
    }
}

/// In-memory refresh-token table keyed by token hash.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, live or not.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&record.token_hash) {
            return Err(StoreError::DuplicateToken);
        }
        tokens.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> StoreResult<bool> {
        let mut tokens = self.tokens.write().await;
        Ok(match tokens.get_mut(token_hash) {
            Some(record) => {
                record.revoked = true;
                true
            }
            None => false,
        })
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().await;
        let mut touched = 0;
        for record in tokens.values_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| r.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| r.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "$2b$04$hash".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com"), Utc::now()).await.unwrap();
        let err = store.create(new_user("a@x.com"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn update_profile_rejects_email_of_other_user() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com"), Utc::now()).await.unwrap();
        store.create(new_user("b@x.com"), Utc::now()).await.unwrap();
        let update = ProfileUpdate {
            name: None,
            email: Some("b@x.com".into()),
        };
        let err = store.update_profile(a.id, update, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn update_profile_keeping_own_email_is_fine() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com"), Utc::now()).await.unwrap();
        let update = ProfileUpdate {
            name: Some("Renamed".into()),
            email: Some("a@x.com".into()),
        };
        let updated = store
            .update_profile(a.id, update, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn consume_reset_requires_matching_unexpired_hash() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com"), Utc::now()).await.unwrap();
        let now = Utc::now();
        store
            .set_reset(user.id, "h1", now + Duration::minutes(10))
            .await
            .unwrap();

        assert!(store.consume_reset("other", now, "new").await.unwrap().is_none());
        let later = now + Duration::minutes(11);
        assert!(store.consume_reset("h1", later, "new").await.unwrap().is_none());

        let consumed = store.consume_reset("h1", now, "new").await.unwrap();
        assert!(consumed.is_some());
        let record = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(record.password_hash, "new");
        assert!(record.reset_token_hash.is_none());
        assert!(record.reset_expires_at.is_none());
        assert!(store.consume_reset("h1", now, "again").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_reset_only_clears_matching_hash() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com"), Utc::now()).await.unwrap();
        let exp = Utc::now() + Duration::minutes(10);
        store.set_reset(user.id, "newer", exp).await.unwrap();
        assert!(!store.clear_reset(user.id, "older").await.unwrap());
        let record = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(record.reset_token_hash.as_deref(), Some("newer"));
        assert!(store.clear_reset(user.id, "newer").await.unwrap());
    }

    #[tokio::test]
    async fn count_by_role_tallies_each_role() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com"), Utc::now()).await.unwrap();
        let b = store.create(new_user("b@x.com"), Utc::now()).await.unwrap();
        store.create(new_user("c@x.com"), Utc::now()).await.unwrap();
        store.set_role(a.id, Role::Admin, Utc::now()).await.unwrap();
        store.set_role(b.id, Role::Moderator, Utc::now()).await.unwrap();
        let counts = store.count_by_role().await.unwrap();
        assert_eq!(
            counts,
            RoleCounts {
                total: 3,
                admins: 1,
                moderators: 1,
                users: 1
            }
        );
    }

    #[tokio::test]
    async fn purge_expired_keeps_live_tokens() {
        let store = MemoryRefreshTokenStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        for (hash, offset) in [("old", -1), ("live", 1)] {
            store
                .insert(RefreshTokenRecord {
                    id: Uuid::now_v7(),
                    user_id,
                    token_hash: hash.into(),
                    expires_at: now + Duration::days(offset),
                    revoked: false,
                    created_at: now,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.find_by_hash("live").await.unwrap().is_some());
        assert!(store.find_by_hash("old").await.unwrap().is_none());
    }
}

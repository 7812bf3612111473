//! Profile editing and admin account management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::refresh::RefreshTokens;
use crate::clock::Clock;
use crate::models::user::{
    ProfileUpdate, Role, RoleCounts, User, is_plausible_email, normalize_email,
};
use crate::store::UserStore;

/// Account operations that sit beside the auth core: a user editing their own
/// profile, and admins listing, re-roling and deleting users.
#[derive(Clone)]
pub struct Accounts {
    users: Arc<dyn UserStore>,
    refresh: RefreshTokens,
    clock: Arc<dyn Clock>,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserStore>, refresh: RefreshTokens, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            refresh,
            clock,
        }
    }

    pub async fn profile(&self, id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(id)
            .await?
            .map(|r| r.user)
            .ok_or(AuthError::UserNotFound)
    }

    /// Change name and/or email. Fields left `None` are kept.
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        let name = match name.map(str::trim) {
            Some("") => return Err(AuthError::InvalidInput("name must not be blank".into())),
            other => other.map(str::to_string),
        };
        let email = match email.map(normalize_email) {
            Some(e) if e.is_empty() => {
                return Err(AuthError::InvalidInput("email must not be blank".into()));
            }
            Some(e) if !is_plausible_email(&e) => {
                return Err(AuthError::InvalidInput("email is not valid".into()));
            }
            other => other,
        };
        let user = self
            .users
            .update_profile(id, ProfileUpdate { name, email }, self.clock.now())
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %id, "profile updated");
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list().await?)
    }

    pub async fn stats(&self) -> Result<RoleCounts, AuthError> {
        Ok(self.users.count_by_role().await?)
    }

    /// Set `target`'s role on behalf of `actor`. Nobody changes their own
    /// role, and the last admin cannot be demoted.
    pub async fn change_role(&self, actor: &User, target: Uuid, role: Role) -> Result<User, AuthError> {
        let record = self
            .users
            .find_by_id(target)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if record.user.id == actor.id {
            return Err(AuthError::NotPermitted("You cannot change your own role"));
        }
        if record.user.role == Role::Admin && role != Role::Admin {
            self.ensure_not_last_admin().await?;
        }
        let user = self
            .users
            .set_role(target, role, self.clock.now())
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(actor = %actor.id, target = %target, role = %role, "role changed");
        Ok(user)
    }

    /// Delete `target` and all of their refresh tokens.
    pub async fn delete(&self, actor: &User, target: Uuid) -> Result<(), AuthError> {
        let record = self
            .users
            .find_by_id(target)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if record.user.id == actor.id {
            return Err(AuthError::NotPermitted("You cannot delete your own account"));
        }
        if record.user.role == Role::Admin {
            self.ensure_not_last_admin().await?;
        }
        self.refresh.forget_user(target).await?;
        if !self.users.delete(target).await? {
            return Err(AuthError::UserNotFound);
        }
        info!(actor = %actor.id, target = %target, "user deleted");
        Ok(())
    }

    // Count-then-act; two admins removing each other at once can still race.
    async fn ensure_not_last_admin(&self) -> Result<(), AuthError> {
        if self.users.count_by_role().await?.admins <= 1 {
            return Err(AuthError::NotPermitted("Cannot remove the last admin"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::user::NewUser;
    use crate::store::{MemoryRefreshTokenStore, MemoryUserStore};

    struct Harness {
        accounts: Accounts,
        users: Arc<MemoryUserStore>,
        refresh: RefreshTokens,
    }

    fn harness() -> Harness {
        let users = Arc::new(MemoryUserStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let refresh = RefreshTokens::new(
            Arc::new(MemoryRefreshTokenStore::new()),
            Duration::days(7),
            clock.clone(),
        );
        Harness {
            accounts: Accounts::new(users.clone(), refresh.clone(), clock),
            users,
            refresh,
        }
    }

    async fn add(users: &MemoryUserStore, email: &str, role: Role) -> User {
        users
            .create(
                NewUser {
                    name: email.into(),
                    email: email.into(),
                    password_hash: "$2b$04$hash".into(),
                    role,
                },
                chrono::Utc::now(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn update_profile_normalizes_and_checks_conflicts() {
        let h = harness();
        let a = add(&h.users, "a@x.com", Role::User).await;
        add(&h.users, "b@x.com", Role::User).await;

        let updated = h
            .accounts
            .update_profile(a.id, Some(" Alice "), Some(" NEW@x.com"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.email, "new@x.com");

        assert!(matches!(
            h.accounts.update_profile(a.id, None, Some("b@x.com")).await,
            Err(AuthError::EmailTaken)
        ));
        assert!(matches!(
            h.accounts.update_profile(a.id, Some(" "), None).await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn cannot_change_own_role() {
        let h = harness();
        let admin = add(&h.users, "root@x.com", Role::Admin).await;
        assert!(matches!(
            h.accounts.change_role(&admin, admin.id, Role::User).await,
            Err(AuthError::NotPermitted(_))
        ));
    }

    #[tokio::test]
    async fn last_admin_cannot_be_demoted_or_deleted() {
        let h = harness();
        let root = add(&h.users, "root@x.com", Role::Admin).await;
        let other = add(&h.users, "other@x.com", Role::Admin).await;

        // With two admins, one may demote the other.
        let demoted = h.accounts.change_role(&root, other.id, Role::User).await.unwrap();
        assert_eq!(demoted.role, Role::User);

        // Leave `other` as the only admin.
        h.accounts.change_role(&root, other.id, Role::Admin).await.unwrap();
        h.accounts.change_role(&other, root.id, Role::Moderator).await.unwrap();
        assert!(matches!(
            h.accounts.delete(&root, other.id).await,
            Err(AuthError::NotPermitted(_))
        ));
        assert!(matches!(
            h.accounts.change_role(&root, other.id, Role::User).await,
            Err(AuthError::NotPermitted(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_user_and_refresh_tokens() {
        let h = harness();
        let admin = add(&h.users, "root@x.com", Role::Admin).await;
        let user = add(&h.users, "u@x.com", Role::User).await;
        let issued = h.refresh.issue(user.id).await.unwrap();

        h.accounts.delete(&admin, user.id).await.unwrap();
        assert!(h.users.find_by_id(user.id).await.unwrap().is_none());
        assert!(matches!(
            h.refresh.redeem(&issued.token).await,
            Err(AuthError::RefreshTokenNotFound)
        ));
        assert!(matches!(
            h.accounts.delete(&admin, user.id).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn cannot_delete_self() {
        let h = harness();
        let admin = add(&h.users, "root@x.com", Role::Admin).await;
        add(&h.users, "root2@x.com", Role::Admin).await;
        assert!(matches!(
            h.accounts.delete(&admin, admin.id).await,
            Err(AuthError::NotPermitted(_))
        ));
    }

    #[tokio::test]
    async fn stats_count_roles() {
        let h = harness();
        add(&h.users, "a@x.com", Role::Admin).await;
        add(&h.users, "m@x.com", Role::Moderator).await;
        add(&h.users, "u@x.com", Role::User).await;
        let stats = h.accounts.stats().await.unwrap();
        assert_eq!((stats.total, stats.admins, stats.moderators, stats.users), (3, 1, 1, 1));
    }
}

//! Authentication service: signup, login, refresh, logout, password reset and
//! the bearer-token gate, composed from the auth primitives.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::jwt::TokenSigner;
use super::password::PasswordHasher;
use super::refresh::RefreshTokens;
use super::reset::{PasswordResets, ResetRequestOutcome};
use crate::accounts::Accounts;
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::mail::Mailer;
use crate::models::auth::{AuthSession, TokenPair};
use crate::models::user::{NewUser, Role, User, is_plausible_email, normalize_email};
use crate::store::{MemoryRefreshTokenStore, MemoryUserStore, RefreshTokenStore, UserStore};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Plaintext used to keep the unknown-email login path as slow as the
/// wrong-password path.
const DUMMY_PASSWORD: &str = "ktp-timing-equalizer";

/// Signup request.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Persistence handed to [`AuthService::new`].
#[derive(Clone)]
pub struct AuthStores {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl AuthStores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            refresh_tokens: Arc::new(MemoryRefreshTokenStore::new()),
        }
    }
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    signer: TokenSigner,
    refresh: RefreshTokens,
    resets: PasswordResets,
    accounts: Accounts,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        stores: AuthStores,
        mailer: Arc<dyn Mailer>,
        mail_timeout: StdDuration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let signer = TokenSigner::new(
            config.jwt_secret.as_bytes(),
            config.access_token_ttl,
            clock.clone(),
        );
        let refresh = RefreshTokens::new(
            stores.refresh_tokens,
            config.refresh_token_ttl,
            clock.clone(),
        );
        let resets = PasswordResets::new(
            stores.users.clone(),
            mailer.clone(),
            hasher,
            clock.clone(),
            config.reset_token_ttl,
            mail_timeout,
            config.public_url.clone(),
        );
        let accounts = Accounts::new(stores.users.clone(), refresh.clone(), clock.clone());
        Self {
            users: stores.users,
            hasher,
            signer,
            refresh,
            resets,
            accounts,
            mailer,
            clock,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn refresh_tokens(&self) -> &RefreshTokens {
        &self.refresh
    }

    /// Profile and admin operations over the same stores.
    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    async fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access_token = self.signer.issue(user_id)?;
        let refresh = self.refresh.issue(user_id).await?;
        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
        })
    }

    /// Register a new account with role `user` and sign it in.
    pub async fn signup(&self, input: SignupInput) -> Result<AuthSession, AuthError> {
        let name = input.name.trim();
        let email = normalize_email(&input.email);
        if name.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(AuthError::MissingFields("name, email and password"));
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::InvalidInput("email is not valid".into()));
        }
        validate_password(&input.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            debug!("signup with registered email");
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&input.password).await?;
        // A concurrent signup can still win the race; the store maps that to EmailTaken.
        let user = self
            .users
            .create(
                NewUser {
                    name: name.to_string(),
                    email,
                    password_hash,
                    role: Role::User,
                },
                self.clock.now(),
            )
            .await?;
        let tokens = self.issue_pair(user.id).await?;
        info!(user_id = %user.id, "user signed up");

        if let Err(e) = self.mailer.send_welcome(&user.email, &user.name).await {
            warn!(user_id = %user.id, error = %e, "welcome mail failed");
        }

        Ok(AuthSession { user, tokens })
    }

    /// Verify credentials and issue a token pair. Unknown email and wrong
    /// password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("email and password"));
        }

        let Some(record) = self.users.find_by_email(&email).await? else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| self.hasher.hash(DUMMY_PASSWORD))
                .await?;
            let _ = self.hasher.verify(password, dummy).await?;
            debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &record.password_hash).await? {
            debug!(user_id = %record.user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair(record.user.id).await?;
        info!(user_id = %record.user.id, "user logged in");
        Ok(AuthSession {
            user: record.user,
            tokens,
        })
    }

    /// Exchange a refresh token for a new access token. The refresh token
    /// itself stays valid.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingFields("refreshToken"));
        }
        let user_id = self.refresh.redeem(refresh_token).await?;
        self.signer.issue(user_id)
    }

    /// Revoke a refresh token. Succeeds for unknown or already-revoked tokens.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingFields("refreshToken"));
        }
        self.refresh.revoke(refresh_token).await
    }

    /// Start a password reset. The outcome is for the caller's logs and
    /// debugging aids; the HTTP answer must not depend on it.
    pub async fn forgot_password(&self, email: &str) -> Result<ResetRequestOutcome, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingFields("email"));
        }
        self.resets.request(email).await
    }

    /// Consume a reset secret, set the new password and sign the user in.
    pub async fn reset_password(
        &self,
        secret: &str,
        new_password: &str,
    ) -> Result<AuthSession, AuthError> {
        if new_password.is_empty() {
            return Err(AuthError::MissingFields("password"));
        }
        validate_password(new_password)?;
        let user = self.resets.consume(secret, new_password).await?;
        // Sessions opened with the old password end here.
        let revoked = self.refresh.revoke_all(user.id).await?;
        info!(user_id = %user.id, revoked, "password reset, sessions revoked");
        let tokens = self.issue_pair(user.id).await?;
        Ok(AuthSession { user, tokens })
    }

    /// Resolve a bearer access token to its user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let user_id = self.signer.verify(access_token)?;
        match self.users.find_by_id(user_id).await? {
            Some(record) => Ok(record.user),
            None => {
                debug!(user_id = %user_id, "token for deleted user");
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Create `email` as an admin unless an account with that email exists.
    /// Returns the user when one was created.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            return Err(AuthError::InvalidInput("email is not valid".into()));
        }
        validate_password(password)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(None);
        }
        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .users
            .create(
                NewUser {
                    name: name.trim().to_string(),
                    email,
                    password_hash,
                    role: Role::Admin,
                },
                self.clock.now(),
            )
            .await?;
        info!(user_id = %user.id, "seeded admin account");
        Ok(Some(user))
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::auth::tokens::hash_secret;
    use crate::clock::ManualClock;
    use crate::mail::MemoryMailer;
    use crate::mail::testing::FailingMailer;

    struct Harness {
        service: AuthService,
        users: Arc<MemoryUserStore>,
        clock: Arc<ManualClock>,
        mailer: Arc<MemoryMailer>,
    }

    fn config() -> AuthConfig {
        let mut config = AuthConfig::with_secret("0123456789abcdef0123456789abcdef");
        config.bcrypt_cost = 4;
        config
    }

    fn harness_with(mailer: Arc<dyn Mailer>) -> (AuthService, Arc<MemoryUserStore>, Arc<ManualClock>) {
        let users = Arc::new(MemoryUserStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let stores = AuthStores {
            users: users.clone(),
            refresh_tokens: Arc::new(MemoryRefreshTokenStore::new()),
        };
        let service = AuthService::new(
            config(),
            stores,
            mailer,
            StdDuration::from_secs(5),
            clock.clone(),
        );
        (service, users, clock)
    }

    fn harness() -> Harness {
        let mailer = Arc::new(MemoryMailer::new());
        let (service, users, clock) = harness_with(mailer.clone());
        Harness {
            service,
            users,
            clock,
            mailer,
        }
    }

    fn alice() -> SignupInput {
        SignupInput {
            name: "A".into(),
            email: "a@x.com".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn signup_hashes_password_and_issues_tokens() {
        let h = harness();
        let session = h.service.signup(alice()).await.unwrap();
        assert!(!session.tokens.access_token.is_empty());
        assert!(!session.tokens.refresh_token.is_empty());
        assert_eq!(session.user.role, Role::User);

        let record = h.users.find_by_id(session.user.id).await.unwrap().unwrap();
        assert_ne!(record.password_hash, "secret1");
        let hasher = PasswordHasher::new(4);
        assert!(hasher.verify("secret1", &record.password_hash).await.unwrap());
        assert!(!hasher.verify("secret2", &record.password_hash).await.unwrap());

        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn created_accounts_are_stamped_by_the_service_clock() {
        let h = harness();
        let at = Utc.with_ymd_and_hms(2031, 3, 4, 5, 6, 7).unwrap();
        h.clock.set(at);

        let user = h.service.signup(alice()).await.unwrap().user;
        assert_eq!(user.created_at, at);
        assert_eq!(user.updated_at, at);

        let admin = h
            .service
            .ensure_admin("Root", "root@x.com", "rootpass")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.created_at, at);
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_rejects_duplicates_case_insensitively() {
        let h = harness();
        let session = h.service.signup(alice()).await.unwrap();
        assert_eq!(session.user.email, "a@x.com");
        let mut again = alice();
        again.email = "  A@X.COM ".into();
        assert!(matches!(
            h.service.signup(again).await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let h = harness();
        let mut missing = alice();
        missing.name = "  ".into();
        assert!(matches!(
            h.service.signup(missing).await,
            Err(AuthError::MissingFields(_))
        ));

        let mut bad_email = alice();
        bad_email.email = "not-an-email".into();
        assert!(matches!(
            h.service.signup(bad_email).await,
            Err(AuthError::InvalidInput(_))
        ));

        let mut short = alice();
        short.password = "abc".into();
        assert!(matches!(
            h.service.signup(short).await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn welcome_mail_failure_does_not_fail_signup() {
        let (service, _, _) = harness_with(Arc::new(FailingMailer));
        assert!(service.signup(alice()).await.is_ok());
    }

    #[tokio::test]
    async fn login_errors_are_indistinguishable() {
        let h = harness();
        h.service.signup(alice()).await.unwrap();
        let wrong_pw = h.service.login("a@x.com", "wrong!").await.unwrap_err();
        let no_user = h.service.login("b@x.com", "whatever").await.unwrap_err();
        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert!(matches!(no_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
    }

    #[tokio::test]
    async fn login_accepts_any_email_case() {
        let h = harness();
        h.service.signup(alice()).await.unwrap();
        assert!(h.service.login("A@X.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let h = harness();
        h.service.signup(alice()).await.unwrap();
        let one = h.service.login("a@x.com", "secret1").await.unwrap();
        let two = h.service.login("a@x.com", "secret1").await.unwrap();
        assert_ne!(one.tokens.refresh_token, two.tokens.refresh_token);
        h.service.logout(&one.tokens.refresh_token).await.unwrap();
        assert!(h.service.refresh(&two.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_then_logout_then_refresh_fails() {
        let h = harness();
        let session = h.service.signup(alice()).await.unwrap();
        let rt = &session.tokens.refresh_token;

        let access = h.service.refresh(rt).await.unwrap();
        assert_eq!(
            h.service.authenticate(&access).await.unwrap().id,
            session.user.id
        );

        h.service.logout(rt).await.unwrap();
        h.service.logout(rt).await.unwrap();
        assert!(matches!(
            h.service.refresh(rt).await,
            Err(AuthError::RefreshTokenRevoked)
        ));
    }

    #[tokio::test]
    async fn logout_with_unknown_token_succeeds() {
        let h = harness();
        h.service.logout("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn access_token_expires_on_the_service_clock() {
        let h = harness();
        let session = h.service.signup(alice()).await.unwrap();
        h.clock.advance(Duration::minutes(16));
        assert!(matches!(
            h.service.authenticate(&session.tokens.access_token).await,
            Err(AuthError::TokenExpired)
        ));
        // The refresh token outlives the access token.
        let access = h.service.refresh(&session.tokens.refresh_token).await.unwrap();
        assert!(h.service.authenticate(&access).await.is_ok());
    }

    #[tokio::test]
    async fn authenticate_rejects_deleted_user() {
        let h = harness();
        let session = h.service.signup(alice()).await.unwrap();
        h.users.delete(session.user.id).await.unwrap();
        assert!(matches!(
            h.service.authenticate(&session.tokens.access_token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn forgot_then_reset_swaps_password() {
        let h = harness();
        h.service.signup(alice()).await.unwrap();
        let ResetRequestOutcome::Sent { secret } =
            h.service.forgot_password("a@x.com").await.unwrap()
        else {
            panic!("expected a sent reset");
        };

        let session = h.service.reset_password(&secret, "newpass1").await.unwrap();
        assert!(!session.tokens.access_token.is_empty());

        assert!(h.service.login("a@x.com", "newpass1").await.is_ok());
        assert!(matches!(
            h.service.login("a@x.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            h.service.reset_password(&secret, "newpass2").await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn reset_revokes_every_earlier_session() {
        let h = harness();
        let first = h.service.signup(alice()).await.unwrap();
        let second = h.service.login("a@x.com", "secret1").await.unwrap();
        let ResetRequestOutcome::Sent { secret } =
            h.service.forgot_password("a@x.com").await.unwrap()
        else {
            panic!("expected a sent reset");
        };

        let fresh = h.service.reset_password(&secret, "newpass1").await.unwrap();
        for old in [&first.tokens.refresh_token, &second.tokens.refresh_token] {
            assert!(matches!(
                h.service.refresh(old).await,
                Err(AuthError::RefreshTokenRevoked)
            ));
        }
        assert!(h.service.refresh(&fresh.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn reset_rejects_short_password_without_consuming() {
        let h = harness();
        let session = h.service.signup(alice()).await.unwrap();
        let ResetRequestOutcome::Sent { secret } =
            h.service.forgot_password("a@x.com").await.unwrap()
        else {
            panic!("expected a sent reset");
        };
        assert!(matches!(
            h.service.reset_password(&secret, "abc").await,
            Err(AuthError::InvalidInput(_))
        ));
        let record = h.users.find_by_id(session.user.id).await.unwrap().unwrap();
        assert_eq!(record.reset_token_hash, Some(hash_secret(&secret)));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_quiet() {
        let h = harness();
        assert_eq!(
            h.service.forgot_password("ghost@x.com").await.unwrap(),
            ResetRequestOutcome::UnknownEmail
        );
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn ensure_admin_creates_once() {
        let h = harness();
        let created = h
            .service
            .ensure_admin("Root", "root@x.com", "rootpass")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.role, Role::Admin);
        assert!(
            h.service
                .ensure_admin("Root", "ROOT@x.com", "rootpass")
                .await
                .unwrap()
                .is_none()
        );
    }
}

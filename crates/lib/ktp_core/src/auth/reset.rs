//! Password-reset lifecycle: mint a single-use secret, mail it, consume it.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::{error, info, warn};

use super::AuthError;
use super::password::PasswordHasher;
use super::tokens::{expiry_after, generate_secret, hash_secret};
use crate::clock::Clock;
use crate::mail::{MailError, Mailer};
use crate::models::user::{User, normalize_email};
use crate::store::UserStore;

/// What happened to a reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// A reset was stored and mailed. `secret` is the raw token.
    Sent { secret: String },
    /// No account with that email; nothing was changed.
    UnknownEmail,
}

#[derive(Clone)]
pub struct PasswordResets {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    mail_timeout: StdDuration,
    public_url: String,
}

impl PasswordResets {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        mail_timeout: StdDuration,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            mailer,
            hasher,
            clock,
            ttl,
            mail_timeout,
            public_url: public_url.into(),
        }
    }

    fn reset_url(&self, secret: &str) -> String {
        format!("{}/reset-password/{secret}", self.public_url)
    }

    /// Start a reset for `email`. Any earlier pending reset for the same user
    /// is replaced. If the mail cannot be delivered the pending reset is
    /// withdrawn again and `MailDelivery` is returned.
    pub async fn request(&self, email: &str) -> Result<ResetRequestOutcome, AuthError> {
        let email = normalize_email(email);
        let Some(record) = self.users.find_by_email(&email).await? else {
            info!("password reset requested for unknown email");
            return Ok(ResetRequestOutcome::UnknownEmail);
        };
        let user_id = record.user.id;

        let secret = generate_secret();
        let token_hash = hash_secret(&secret);
        let expires_at = expiry_after(self.clock.now(), self.ttl)?;
        if !self.users.set_reset(user_id, &token_hash, expires_at).await? {
            info!(user_id = %user_id, "user vanished before reset could be stored");
            return Ok(ResetRequestOutcome::UnknownEmail);
        }

        let url = self.reset_url(&secret);
        let sent = tokio::time::timeout(
            self.mail_timeout,
            self.mailer.send_password_reset(&email, &url, self.ttl),
        )
        .await
        .unwrap_or(Err(MailError::Timeout));

        if let Err(e) = sent {
            error!(user_id = %user_id, error = %e, "password reset mail failed, withdrawing reset");
            // A newer request may have replaced our hash meanwhile; leave that one alone.
            if let Err(clear_err) = self.users.clear_reset(user_id, &token_hash).await {
                error!(user_id = %user_id, error = %clear_err, "failed to withdraw reset");
            }
            return Err(AuthError::MailDelivery(e));
        }

        info!(user_id = %user_id, "password reset mailed");
        Ok(ResetRequestOutcome::Sent { secret })
    }

    /// Consume a reset secret and set `new_password`. Exactly one of several
    /// concurrent consumers of the same secret succeeds.
    pub async fn consume(&self, secret: &str, new_password: &str) -> Result<User, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidOrExpiredToken);
        }
        let new_hash = self.hasher.hash(new_password).await?;
        let user = self
            .users
            .consume_reset(&hash_secret(secret), self.clock.now(), &new_hash)
            .await?
            .ok_or_else(|| {
                warn!("reset attempted with invalid or expired token");
                AuthError::InvalidOrExpiredToken
            })?;
        info!(user_id = %user.id, "password reset completed");
        Ok(user)
    }
}

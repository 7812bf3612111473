//! Outgoing email.
//!
//! The auth core only sees the [`Mailer`] trait. `SmtpMailer` delivers through
//! lettre; `ConsoleMailer` logs messages for local development,
//! `MemoryMailer` keeps them in an outbox and `DisabledMailer` refuses every
//! delivery.

pub mod smtp;
pub mod templates;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AppEnv, MailConfig};

pub use smtp::SmtpMailer;

/// Mail delivery errors.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("delivery timed out")]
    Timeout,

    #[error("mail delivery is not configured")]
    NotConfigured,
}

/// A rendered message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand a message to the transport.
    async fn deliver(&self, email: Email) -> Result<(), MailError>;

    async fn send_password_reset(
        &self,
        to: &str,
        reset_url: &str,
        valid_for: Duration,
    ) -> Result<(), MailError> {
        self.deliver(templates::password_reset(to, reset_url, valid_for.num_minutes()))
            .await
    }

    async fn send_welcome(&self, to: &str, name: &str) -> Result<(), MailError> {
        self.deliver(templates::welcome(to, name)).await
    }
}

/// Logs each message instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn deliver(&self, email: Email) -> Result<(), MailError> {
        // The body may carry a live reset link; keep it out of info logs.
        info!(to = %email.to, subject = %email.subject, "mail (console)");
        debug!(to = %email.to, "mail body\n{}", email.text);
        Ok(())
    }
}

/// Keeps every delivered message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, oldest first.
    pub fn sent(&self) -> Vec<Email> {
        self.outbox.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Email> {
        self.outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn deliver(&self, email: Email) -> Result<(), MailError> {
        self.outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email);
        Ok(())
    }
}

/// Rejects every delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn deliver(&self, email: Email) -> Result<(), MailError> {
        warn!(subject = %email.subject, "mail transport not configured, dropping message");
        Err(MailError::NotConfigured)
    }
}

/// Pick a transport: SMTP when configured, otherwise console output in
/// development and a refusing mailer in production.
pub fn build_mailer(config: &MailConfig, env: AppEnv) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, "using SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(smtp, &config.from, config.timeout)?))
        }
        None if env.is_production() => {
            warn!("SMTP not configured; password-reset mail will fail");
            Ok(Arc::new(DisabledMailer))
        }
        None => {
            info!("SMTP not configured; logging mail to console");
            Ok(Arc::new(ConsoleMailer))
        }
    }
}

//! SMTP delivery over lettre's tokio transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error};

use super::{Email, MailError, Mailer};
use crate::config::SmtpSettings;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a TLS relay transport. `timeout` bounds each SMTP command.
    pub fn new(settings: &SmtpSettings, from: &str, timeout: Duration) -> Result<Self, MailError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| MailError::Address(format!("{from}: {e}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.pass.clone(),
            ))
            .timeout(Some(timeout))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, email: Email) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {e}", email.to)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|e| MailError::Build(e.to_string()))?;

        match self.transport.send(message).await {
            Ok(response) => {
                debug!(code = %response.code(), "mail accepted by relay");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "SMTP delivery failed");
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}

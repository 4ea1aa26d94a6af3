//! SMTP email channel

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::config::Notification;
use super::notifier::{html_body, NotifierError, NotifyChannel};
use crate::config::SmtpConfig;

/// Shared SMTP relay connection settings
pub type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Build a STARTTLS relay transport from configuration
pub fn build_transport(config: &SmtpConfig) -> Result<SmtpTransport, NotifierError> {
    let mut builder = SmtpTransport::starttls_relay(&config.host)
        .map_err(|e| NotifierError::Config(format!("SMTP relay {}: {}", config.host, e)))?
        .port(config.port);

    if !config.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ));
    }

    Ok(builder.build())
}

/// Delivers notifications to a single recipient
pub struct EmailChannel {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(transport: SmtpTransport, from: &str, to: &str) -> Result<Self, NotifierError> {
        Ok(Self {
            transport,
            from: parse_mailbox(from)?,
            to: parse_mailbox(to)?,
        })
    }

    /// Build the multipart message: plain text plus an escaped HTML part
    pub fn build_message(&self, notification: &Notification) -> Result<Message, NotifierError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                notification.body.clone(),
                html_body(&notification.body),
            ))
            .map_err(|e| NotifierError::Email(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifierError> {
    address
        .parse()
        .map_err(|e| NotifierError::Config(format!("invalid address '{}': {}", address, e)))
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifierError> {
        let message = self.build_message(notification)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotifierError::Email(e.to_string()))?;

        tracing::debug!(
            to = %self.to,
            code = %response.code(),
            "SMTP relay accepted message"
        );
        Ok(())
    }
}

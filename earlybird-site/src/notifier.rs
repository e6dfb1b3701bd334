use std::time::Duration;

use async_trait::async_trait;
use earlybird_core::Notifier;
use earlybird_shared::CheckinEvent;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::app_config::NotifyConfig;

/// Upper bound on one mail hand-off, connect to QUIT.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Reports events on the console log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &CheckinEvent) {
        info!("{}\n{}", event.subject(), event.body());
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailConfigError {
    #[error("smtp_server is set but email_from is missing")]
    MissingSender,
    #[error("smtp_server is set but email_to names no recipients")]
    MissingRecipients,
    #[error("Invalid email address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("Cannot set up mail relay: {0}")]
    Relay(#[from] lettre::transport::smtp::Error),
}

/// Logs every event and mails it to the configured recipients through an SMTP relay.
/// A failed hand-off is logged and otherwise ignored.
pub struct SmtpNotifier {
    from: Mailbox,
    to: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// `None` when no relay is configured.
    pub fn from_config(config: &NotifyConfig) -> Result<Option<Self>, MailConfigError> {
        let Some(server) = config.smtp_server.as_deref() else {
            return Ok(None);
        };
        let sender = config.email_from.as_deref().ok_or(MailConfigError::MissingSender)?;
        let from = mailbox(sender)?;
        let to = config
            .recipients()
            .iter()
            .map(|address| mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(MailConfigError::MissingRecipients);
        }

        let builder = if config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };
        let mut builder = builder.port(config.smtp_port).timeout(Some(SEND_TIMEOUT));
        if let Some(password) = config.smtp_password.as_deref().filter(|p| !p.is_empty()) {
            let user = config.smtp_user.as_deref().unwrap_or(sender);
            builder = builder.credentials(Credentials::new(user.to_string(), password.to_string()));
        }

        Ok(Some(Self {
            from,
            to,
            transport: builder.build(),
        }))
    }

    fn message(&self, event: &CheckinEvent) -> Result<Message, lettre::error::Error> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(event.subject());
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        builder.header(ContentType::TEXT_PLAIN).body(event.body())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, event: &CheckinEvent) {
        LogNotifier.notify(event).await;

        let message = match self.message(event) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Cannot build email");
                return;
            }
        };
        match self.transport.send(message).await {
            Ok(_) => info!(subject = event.subject(), recipients = self.to.len(), "Email sent"),
            Err(e) => warn!(subject = event.subject(), error = %e, "Error sending email"),
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailConfigError> {
    address
        .parse()
        .map_err(|source| MailConfigError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

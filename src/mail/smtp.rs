//! SMTP delivery through `lettre`.

use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use async_trait::async_trait;

use super::{EmailDispatcher, EmailMessage, MailError};
use crate::config::MailConfig;

/// Sends notices through an SMTP relay. The blocking transport runs on the
/// tokio blocking pool.
#[derive(Clone)]
pub struct SmtpDispatcher {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpDispatcher {
    pub fn from_config(host: &str, config: &MailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.from)?;

        let transport = match (&config.smtp_user, &config.smtp_pass) {
            (Some(user), Some(pass)) => SmtpTransport::starttls_relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .port(config.smtp_port)
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => SmtpTransport::builder_dangerous(host)
                .port(config.smtp_port)
                .build(),
        };

        Ok(Self { transport, from })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message, MailError> {
        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailDispatcher for SmtpDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let email = self.build(&message)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|_| MailError::WorkerGone)?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(to = %message.to, subject = %message.subject, "Notification email sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> SmtpDispatcher {
        SmtpDispatcher::from_config("localhost", &MailConfig::default()).expect("dispatcher")
    }

    #[test]
    fn builds_plain_text_message() {
        let message = dispatcher()
            .build(&EmailMessage {
                to: "holder@example.com".to_string(),
                subject: "[TKT-ABCDEFGH] Status updated".to_string(),
                body: "Moved to RESOLVED".to_string(),
            })
            .expect("message");

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: holder@example.com"));
        assert!(raw.contains("Subject: [TKT-ABCDEFGH] Status updated"));
    }

    #[test]
    fn rejects_malformed_recipient() {
        let result = dispatcher().build(&EmailMessage {
            to: "not an address".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        assert!(matches!(result, Err(MailError::InvalidAddress { .. })));
    }
}

//! Outbound notification email.
//!
//! Ticket events are rendered into plain-text [`EmailMessage`]s and handed to an
//! [`EmailDispatcher`]. Delivery is best effort: callers log failures and never
//! roll back the state change that triggered the notice.

pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::config::MailConfig;
use crate::models::ticket::{Model as Ticket, TicketStatus};

pub use smtp::SmtpDispatcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp delivery failed: {0}")]
    Transport(String),
    #[error("mail worker stopped before delivery")]
    WorkerGone,
}

/// Delivers notification emails.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Dispatcher used when no SMTP relay is configured: notices are only logged.
#[derive(Debug, Default, Clone)]
pub struct LogDispatcher;

#[async_trait]
impl EmailDispatcher for LogDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured, notification logged only"
        );
        Ok(())
    }
}

/// Picks the SMTP dispatcher when a host is configured, otherwise [`LogDispatcher`].
pub fn dispatcher_from_config(config: &MailConfig) -> Result<Arc<dyn EmailDispatcher>, MailError> {
    match config.smtp_host.as_deref() {
        Some(host) => {
            tracing::info!(smtp_host = %host, smtp_port = config.smtp_port, "Using SMTP mail dispatcher");
            Ok(Arc::new(SmtpDispatcher::from_config(host, config)?))
        }
        None => Ok(Arc::new(LogDispatcher)),
    }
}

/// Sends `message`, logging instead of propagating failures.
pub async fn send_best_effort(dispatcher: &dyn EmailDispatcher, message: EmailMessage) -> bool {
    let to = message.to.clone();
    let subject = message.subject.clone();
    match dispatcher.send(message).await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%to, %subject, %error, "Notification email not delivered");
            false
        }
    }
}

/// Notice to the requester after a status change. `None` when no contact is on file.
pub fn status_changed_notice(ticket: &Ticket, previous: TicketStatus) -> Option<EmailMessage> {
    let to = ticket.requester_email.clone()?;
    Some(EmailMessage {
        to,
        subject: format!("[{}] Status updated to {}", ticket.ticket_id, ticket.status),
        body: format!(
            "Your support ticket {} (\"{}\") moved from {} to {}.\n\nReply in the app to add details.",
            ticket.ticket_id, ticket.subject, previous, ticket.status
        ),
    })
}

/// Warning to the assignee that the SLA deadline is close.
pub fn sla_warning_notice(ticket: &Ticket, to: &str, remaining: Duration) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("[{}] SLA deadline approaching", ticket.ticket_id),
        body: format!(
            "Ticket {} (\"{}\", priority {}) breaches its SLA in {}.\nDeadline: {}",
            ticket.ticket_id,
            ticket.subject,
            ticket.priority,
            format_remaining(remaining),
            ticket.sla_deadline.to_rfc3339()
        ),
    }
}

/// Breach notice to the administrative recipient.
pub fn sla_breach_notice(ticket: &Ticket, admin_email: &str) -> EmailMessage {
    EmailMessage {
        to: admin_email.to_string(),
        subject: format!("[{}] SLA breached, escalated to EMERGENCY", ticket.ticket_id),
        body: format!(
            "Ticket {} (\"{}\") missed its SLA deadline of {} and was escalated.\nRequester: {}{}",
            ticket.ticket_id,
            ticket.subject,
            ticket.sla_deadline.to_rfc3339(),
            ticket.user_id,
            ticket
                .requester_email
                .as_deref()
                .map(|email| format!(" <{email}>"))
                .unwrap_or_default()
        ),
    }
}

pub fn assignment_notice(ticket: &Ticket, to: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("[{}] Assigned to you", ticket.ticket_id),
        body: format!(
            "Ticket {} (\"{}\", {} / {}) is now assigned to you.\nSLA deadline: {}",
            ticket.ticket_id,
            ticket.subject,
            ticket.category,
            ticket.priority,
            ticket.sla_deadline.to_rfc3339()
        ),
    }
}

/// Renders a duration as `1h 05m` or `42m`.
fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_formatting() {
        assert_eq!(format_remaining(Duration::minutes(50)), "50m");
        assert_eq!(format_remaining(Duration::minutes(65)), "1h 05m");
        assert_eq!(format_remaining(Duration::seconds(-30)), "0m");
    }

    #[tokio::test]
    async fn log_dispatcher_accepts_everything() {
        let sent = send_best_effort(
            &LogDispatcher,
            EmailMessage {
                to: "agent@example.com".to_string(),
                subject: "hello".to_string(),
                body: "body".to_string(),
            },
        )
        .await;
        assert!(sent);
    }

    #[test]
    fn unconfigured_smtp_falls_back_to_logging() {
        assert!(dispatcher_from_config(&MailConfig::default()).is_ok());
    }
}

//! Ticket operations that combine persistence with notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TicketError;
use crate::mail::{
    EmailDispatcher, assignment_notice, send_best_effort, status_changed_notice,
};
use crate::models::ticket::{Model as Ticket, TicketCategory, TicketPriority, TicketStatus};
use crate::models::ticket_message::Model as TicketMessage;
use crate::repositories::{NewTicket, TicketFilter, TicketRepository};

const MAX_SUBJECT_CHARS: usize = 200;
const MAX_ATTACHMENTS: usize = 10;

/// Ticket opened directly by a user.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub subject: String,
    pub query: String,
    pub category: TicketCategory,
    /// Free-form label; unknown values fall back to LOW
    pub priority: Option<String>,
    pub policy_id: Option<Uuid>,
    pub claim_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct TicketService {
    repo: TicketRepository,
    mailer: Arc<dyn EmailDispatcher>,
}

impl TicketService {
    pub fn new(repo: TicketRepository, mailer: Arc<dyn EmailDispatcher>) -> Self {
        Self { repo, mailer }
    }

    pub fn repository(&self) -> &TicketRepository {
        &self.repo
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        requester_email: Option<String>,
        input: CreateTicket,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        if user_id.is_nil() {
            return Err(TicketError::validation("user_id", "user_id is required"));
        }
        let subject = input.subject.trim();
        if subject.is_empty() {
            return Err(TicketError::validation("subject", "subject cannot be empty"));
        }
        if subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(TicketError::validation(
                "subject",
                format!("subject cannot exceed {MAX_SUBJECT_CHARS} characters"),
            ));
        }
        let query = input.query.trim();
        if query.is_empty() {
            return Err(TicketError::validation("query", "query cannot be empty"));
        }

        let priority = input
            .priority
            .as_deref()
            .map(TicketPriority::from_label)
            .unwrap_or_default();

        self.repo
            .create(
                NewTicket {
                    user_id,
                    requester_email,
                    category: input.category,
                    priority,
                    subject: subject.to_string(),
                    query: query.to_string(),
                    ai_response: None,
                    policy_id: input.policy_id,
                    claim_id: input.claim_id,
                },
                now,
            )
            .await
    }

    pub async fn find(&self, reference: &str) -> Result<Ticket, TicketError> {
        self.repo.find_by_ref(reference).await
    }

    pub async fn list(
        &self,
        filter: &TicketFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Ticket>, u64), TicketError> {
        self.repo.list(filter, page, limit).await
    }

    pub async fn messages(&self, ticket: &Ticket) -> Result<Vec<TicketMessage>, TicketError> {
        self.repo.messages(ticket.id).await
    }

    /// Appends a reply and returns the refreshed ticket.
    pub async fn reply(
        &self,
        ticket: &Ticket,
        sender_id: Uuid,
        body: &str,
        attachments: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(TicketError::validation("body", "message body cannot be empty"));
        }
        if attachments.len() > MAX_ATTACHMENTS {
            return Err(TicketError::validation(
                "attachments",
                format!("at most {MAX_ATTACHMENTS} attachments per message"),
            ));
        }
        if attachments.iter().any(|reference| reference.trim().is_empty()) {
            return Err(TicketError::validation(
                "attachments",
                "attachment references cannot be empty",
            ));
        }

        let message = self
            .repo
            .append_message(ticket.id, sender_id, body.to_string(), attachments, now)
            .await?;
        tracing::info!(
            ticket_id = %ticket.ticket_id,
            message_id = message.id,
            sender_id = %sender_id,
            "Message appended"
        );

        self.repo.find_by_pk(ticket.id).await
    }

    /// Applies a state machine transition and notifies the requester. A failed
    /// notice is logged; the transition stands.
    pub async fn transition(
        &self,
        ticket: &Ticket,
        to: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let previous = ticket.status;
        let updated = self.repo.update_status_checked(ticket, to, now).await?;
        tracing::info!(
            ticket_id = %updated.ticket_id,
            from = %previous,
            to = %updated.status,
            "Ticket status changed"
        );

        match status_changed_notice(&updated, previous) {
            Some(notice) => {
                send_best_effort(self.mailer.as_ref(), notice).await;
            }
            None => {
                tracing::debug!(ticket_id = %updated.ticket_id, "No requester email on file, skipping status notice");
            }
        }

        Ok(updated)
    }

    /// Assigns an agent and emails them when an address is known.
    pub async fn assign(
        &self,
        ticket: &Ticket,
        agent_id: Uuid,
        agent_email: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        if agent_id.is_nil() {
            return Err(TicketError::validation("agent_id", "agent_id is required"));
        }
        let agent_email = agent_email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());
        if let Some(email) = agent_email.as_deref()
            && !email.contains('@')
        {
            return Err(TicketError::validation(
                "agent_email",
                "agent_email must be an email address",
            ));
        }

        let updated = self.repo.set_assignee(ticket, agent_id, agent_email, now).await?;
        tracing::info!(ticket_id = %updated.ticket_id, agent_id = %agent_id, "Ticket assigned");

        if let Some(email) = updated.assignee_email.as_deref() {
            send_best_effort(self.mailer.as_ref(), assignment_notice(&updated, email)).await;
        }

        Ok(updated)
    }

    /// Manual priority change. The SLA deadline is left as computed at creation.
    pub async fn reprioritize(
        &self,
        ticket: &Ticket,
        priority: TicketPriority,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let updated = self.repo.set_priority(ticket, priority, now).await?;
        tracing::info!(
            ticket_id = %updated.ticket_id,
            from = %ticket.priority,
            to = %updated.priority,
            "Ticket priority changed"
        );
        Ok(updated)
    }
}

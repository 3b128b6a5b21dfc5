//! # Ticket Repository
//!
//! SeaORM access to the `tickets` and `ticket_messages` tables. Flag and status
//! writes are conditional updates so concurrent writers cannot both win.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, UpdateMany,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::error::{TicketError, is_unique_violation};
use crate::models::ticket::{
    ActiveModel, Column, Entity, Model, TicketCategory, TicketPriority, TicketStatus,
};
use crate::models::ticket_message;
use crate::tickets::{deadline::compute_deadline, state_machine::ensure_transition};

/// Attempts made to find an unused ticket code before giving up.
pub const MAX_TICKET_ID_ATTEMPTS: u32 = 5;

const TICKET_CODE_PREFIX: &str = "TKT-";
const TICKET_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TICKET_CODE_LEN: usize = 8;

/// Generates a candidate ticket code such as `TKT-7Q2MZK4A`.
pub fn generate_ticket_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TICKET_CODE_LEN)
        .map(|_| TICKET_CODE_CHARSET[rng.gen_range(0..TICKET_CODE_CHARSET.len())] as char)
        .collect();
    format!("{TICKET_CODE_PREFIX}{suffix}")
}

pub fn is_ticket_code(value: &str) -> bool {
    value.strip_prefix(TICKET_CODE_PREFIX).is_some_and(|suffix| {
        suffix.len() == TICKET_CODE_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

/// Everything needed to open a ticket; the store fills in identity, status,
/// flags and the SLA deadline.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: Uuid,
    pub requester_email: Option<String>,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub subject: String,
    pub query: String,
    pub ai_response: Option<String>,
    pub policy_id: Option<Uuid>,
    pub claim_id: Option<Uuid>,
}

/// Filters for ticket listings.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Restrict to one requester; `None` lists everyone's tickets.
    pub user_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
    /// Case-insensitive substring match on the subject
    pub search: Option<String>,
}

/// Repository for ticket database operations
#[derive(Clone)]
pub struct TicketRepository {
    db: DatabaseConnection,
}

impl TicketRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a ticket with a freshly generated code.
    pub async fn create(&self, draft: NewTicket, now: DateTime<Utc>) -> Result<Model, TicketError> {
        self.create_with_codes(draft, now, generate_ticket_code).await
    }

    /// Opens a ticket drawing candidate codes from `next_code`, retrying on
    /// unique-index collisions.
    pub async fn create_with_codes<F>(
        &self,
        draft: NewTicket,
        now: DateTime<Utc>,
        mut next_code: F,
    ) -> Result<Model, TicketError>
    where
        F: FnMut() -> String,
    {
        let created_at = now.fixed_offset();
        let sla_deadline = compute_deadline(draft.priority, now).fixed_offset();

        for attempt in 1..=MAX_TICKET_ID_ATTEMPTS {
            let ticket_id = next_code();
            let ticket = ActiveModel {
                id: Set(Uuid::new_v4()),
                ticket_id: Set(ticket_id.clone()),
                user_id: Set(draft.user_id),
                requester_email: Set(draft.requester_email.clone()),
                category: Set(draft.category),
                priority: Set(draft.priority),
                status: Set(TicketStatus::Open),
                subject: Set(draft.subject.clone()),
                query: Set(draft.query.clone()),
                ai_response: Set(draft.ai_response.clone()),
                policy_id: Set(draft.policy_id),
                claim_id: Set(draft.claim_id),
                assigned_to: Set(None),
                assignee_email: Set(None),
                warning_sent: Set(false),
                is_escalated: Set(false),
                sla_deadline: Set(sla_deadline),
                created_at: Set(created_at),
                updated_at: Set(created_at),
            };

            match ticket.insert(&self.db).await {
                Ok(model) => {
                    tracing::info!(
                        ticket_id = %model.ticket_id,
                        user_id = %model.user_id,
                        priority = %model.priority,
                        category = %model.category,
                        sla_deadline = %model.sla_deadline,
                        "Ticket created"
                    );
                    return Ok(model);
                }
                Err(err) if is_unique_violation(&err) => {
                    tracing::warn!(attempt, ticket_id = %ticket_id, "Ticket code collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(TicketError::IdGenerationExhausted {
            attempts: MAX_TICKET_ID_ATTEMPTS,
        })
    }

    pub async fn find_by_pk(&self, id: Uuid) -> Result<Model, TicketError> {
        Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TicketError::ticket_not_found(id.to_string()))
    }

    /// Resolves either the primary key UUID or the `TKT-` code.
    pub async fn find_by_ref(&self, reference: &str) -> Result<Model, TicketError> {
        let reference = reference.trim();

        if let Ok(id) = Uuid::parse_str(reference) {
            return self.find_by_pk(id).await;
        }

        Entity::find()
            .filter(Column::TicketId.eq(reference.to_ascii_uppercase()))
            .one(&self.db)
            .await?
            .ok_or_else(|| TicketError::ticket_not_found(reference))
    }

    /// Lists tickets newest first. `page` is 1-based. Returns the page and the
    /// total number of matching tickets.
    pub async fn list(
        &self,
        filter: &TicketFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Model>, u64), TicketError> {
        let mut query = Entity::find();

        if let Some(user_id) = filter.user_id {
            query = query.filter(Column::UserId.eq(user_id));
        }

        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(Expr::expr(Func::lower(Expr::col(Column::Subject))).like(pattern));
        }

        let paginator = query
            .order_by_desc(Column::CreatedAt)
            .order_by_asc(Column::TicketId)
            .paginate(&self.db, limit.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    /// Appends a message to the thread. Rejected once the ticket is CLOSED.
    pub async fn append_message(
        &self,
        ticket_pk: Uuid,
        sender_id: Uuid,
        body: String,
        attachments: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<ticket_message::Model, TicketError> {
        let txn = self.db.begin().await?;
        let now = now.fixed_offset();

        // Touching the row first takes its lock for the rest of the transaction.
        let touched = Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(ticket_pk))
            .filter(Column::Status.ne(TicketStatus::Closed))
            .exec(&txn)
            .await?;

        if touched.rows_affected == 0 {
            let ticket = Entity::find_by_id(ticket_pk).one(&txn).await?;
            txn.rollback().await?;
            return Err(match ticket {
                Some(ticket) => TicketError::TicketClosed {
                    ticket_id: ticket.ticket_id,
                },
                None => TicketError::ticket_not_found(ticket_pk.to_string()),
            });
        }

        let message = ticket_message::ActiveModel {
            ticket_pk: Set(ticket_pk),
            sender_id: Set(sender_id),
            body: Set(body),
            attachments: Set(serde_json::json!(attachments)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(message)
    }

    /// Thread of a ticket in insertion order.
    pub async fn messages(&self, ticket_pk: Uuid) -> Result<Vec<ticket_message::Model>, TicketError> {
        Ok(ticket_message::Entity::find()
            .filter(ticket_message::Column::TicketPk.eq(ticket_pk))
            .order_by_asc(ticket_message::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Records the assigned agent and their contact address.
    pub async fn set_assignee(
        &self,
        ticket: &Model,
        agent_id: Uuid,
        agent_email: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Model, TicketError> {
        self.update_open_ticket(ticket, now, |update| {
            update
                .col_expr(Column::AssignedTo, Expr::value(Some(agent_id)))
                .col_expr(Column::AssigneeEmail, Expr::value(agent_email))
        })
        .await
    }

    /// Changes the priority. The SLA deadline keeps the value computed at creation.
    pub async fn set_priority(
        &self,
        ticket: &Model,
        priority: TicketPriority,
        now: DateTime<Utc>,
    ) -> Result<Model, TicketError> {
        self.update_open_ticket(ticket, now, |update| {
            update.col_expr(Column::Priority, Expr::value(priority))
        })
        .await
    }

    /// Applies `apply` to the row unless it is CLOSED at write time.
    async fn update_open_ticket<F>(
        &self,
        ticket: &Model,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<Model, TicketError>
    where
        F: FnOnce(UpdateMany<Entity>) -> UpdateMany<Entity>,
    {
        let update = Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(Column::Id.eq(ticket.id))
            .filter(Column::Status.ne(TicketStatus::Closed));

        let result = apply(update).exec(&self.db).await?;
        if result.rows_affected == 0 {
            let current = self.find_by_pk(ticket.id).await?;
            return Err(TicketError::TicketClosed {
                ticket_id: current.ticket_id,
            });
        }

        self.find_by_pk(ticket.id).await
    }

    /// Moves `ticket` to `to` if the transition table allows it and nobody else
    /// changed the status since `ticket` was read.
    pub async fn update_status_checked(
        &self,
        ticket: &Model,
        to: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Model, TicketError> {
        ensure_transition(ticket.status, to)?;

        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(to))
            .col_expr(Column::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(Column::Id.eq(ticket.id))
            .filter(Column::Status.eq(ticket.status))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(TicketError::Conflict {
                ticket_id: ticket.ticket_id.clone(),
            });
        }

        self.find_by_pk(ticket.id).await
    }

    /// Tickets whose deadline falls inside `(now, now + window)` and that have
    /// not been warned or escalated yet.
    pub async fn warning_candidates(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Model>, TicketError> {
        Ok(Entity::find()
            .filter(Column::Status.is_in(TicketStatus::sla_tracked()))
            .filter(Column::WarningSent.eq(false))
            .filter(Column::IsEscalated.eq(false))
            .filter(Column::SlaDeadline.gt(now.fixed_offset()))
            .filter(Column::SlaDeadline.lt((now + window).fixed_offset()))
            .order_by_asc(Column::SlaDeadline)
            .all(&self.db)
            .await?)
    }

    /// Tickets past their deadline that have not been escalated yet.
    pub async fn breached(&self, now: DateTime<Utc>) -> Result<Vec<Model>, TicketError> {
        Ok(Entity::find()
            .filter(Column::Status.is_in(TicketStatus::sla_tracked()))
            .filter(Column::IsEscalated.eq(false))
            .filter(Column::SlaDeadline.lt(now.fixed_offset()))
            .order_by_asc(Column::SlaDeadline)
            .all(&self.db)
            .await?)
    }

    /// Sets `warning_sent` if it is still false. Returns true when this call won.
    pub async fn mark_warning_sent(
        &self,
        ticket_pk: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, TicketError> {
        let result = Entity::update_many()
            .col_expr(Column::WarningSent, Expr::value(true))
            .col_expr(Column::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(Column::Id.eq(ticket_pk))
            .filter(Column::WarningSent.eq(false))
            .filter(Column::IsEscalated.eq(false))
            .filter(Column::Status.is_in(TicketStatus::sla_tracked()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Sets `is_escalated` and forces EMERGENCY priority if the ticket is not
    /// escalated yet. Returns true when this call won.
    pub async fn mark_escalated(
        &self,
        ticket_pk: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, TicketError> {
        let result = Entity::update_many()
            .col_expr(Column::IsEscalated, Expr::value(true))
            .col_expr(Column::Priority, Expr::value(TicketPriority::Emergency))
            .col_expr(Column::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(Column::Id.eq(ticket_pk))
            .filter(Column::IsEscalated.eq(false))
            .filter(Column::Status.is_in(TicketStatus::sla_tracked()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}

//! # Ticket Model
//!
//! A support ticket raised by a policyholder, either directly or by the chat
//! deflection pipeline when it could not answer confidently.

use std::fmt;

use sea_orm::{ActiveModelBehavior, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ticket_message::TicketMessageResponse;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable code, `TKT-` followed by 8 uppercase alphanumerics
    #[sea_orm(unique)]
    pub ticket_id: String,

    pub user_id: Uuid,
    pub requester_email: Option<String>,

    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,

    pub subject: String,
    pub query: String,

    /// Draft answer kept when the ticket came from an unresolved chat query
    pub ai_response: Option<String>,

    pub policy_id: Option<Uuid>,
    pub claim_id: Option<Uuid>,

    pub assigned_to: Option<Uuid>,
    pub assignee_email: Option<String>,

    pub warning_sent: bool,
    pub is_escalated: bool,

    /// Fixed at creation from the priority at that moment
    pub sla_deadline: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_message::Entity")]
    Messages,
}

impl Related<super::ticket_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Ticket lifecycle states.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TicketStatus {
    #[sea_orm(string_value = "OPEN")]
    #[serde(rename = "OPEN")]
    #[default]
    Open,

    #[sea_orm(string_value = "IN_REVIEW")]
    #[serde(rename = "IN_REVIEW")]
    InReview,

    #[sea_orm(string_value = "WAITING")]
    #[serde(rename = "WAITING")]
    Waiting,

    #[sea_orm(string_value = "RESOLVED")]
    #[serde(rename = "RESOLVED")]
    Resolved,

    #[sea_orm(string_value = "CLOSED")]
    #[serde(rename = "CLOSED")]
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::InReview => "IN_REVIEW",
            TicketStatus::Waiting => "WAITING",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Closed => "CLOSED",
        }
    }

    /// Statuses the escalation sweep watches.
    pub fn sla_tracked() -> [TicketStatus; 2] {
        [TicketStatus::Open, TicketStatus::InReview]
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency levels, each with its own SLA window.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TicketPriority {
    #[sea_orm(string_value = "LOW")]
    #[serde(rename = "LOW")]
    #[default]
    Low,

    #[sea_orm(string_value = "MEDIUM")]
    #[serde(rename = "MEDIUM")]
    Medium,

    #[sea_orm(string_value = "HIGH")]
    #[serde(rename = "HIGH")]
    High,

    #[sea_orm(string_value = "EMERGENCY")]
    #[serde(rename = "EMERGENCY", alias = "URGENT")]
    Emergency,
}

impl TicketPriority {
    /// Parses a priority label leniently: `URGENT` maps to EMERGENCY and anything
    /// unrecognised (including blank) maps to LOW.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "EMERGENCY" | "URGENT" => TicketPriority::Emergency,
            "HIGH" => TicketPriority::High,
            "MEDIUM" => TicketPriority::Medium,
            _ => TicketPriority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Medium => "MEDIUM",
            TicketPriority::High => "HIGH",
            TicketPriority::Emergency => "EMERGENCY",
        }
    }

    /// Ordinal urgency, higher is more urgent.
    pub fn urgency(&self) -> u8 {
        match self {
            TicketPriority::Low => 0,
            TicketPriority::Medium => 1,
            TicketPriority::High => 2,
            TicketPriority::Emergency => 3,
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TicketCategory {
    #[sea_orm(string_value = "CLAIM")]
    #[serde(rename = "CLAIM")]
    Claim,

    #[sea_orm(string_value = "PAYMENT")]
    #[serde(rename = "PAYMENT")]
    Payment,

    #[sea_orm(string_value = "POLICY")]
    #[serde(rename = "POLICY")]
    Policy,

    #[sea_orm(string_value = "ACCOUNT")]
    #[serde(rename = "ACCOUNT")]
    Account,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Claim => "CLAIM",
            TicketCategory::Payment => "PAYMENT",
            TicketCategory::Policy => "POLICY",
            TicketCategory::Account => "ACCOUNT",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public representation of a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponse {
    pub id: Uuid,
    #[schema(example = "TKT-7Q2MZK4A")]
    pub ticket_id: String,
    pub user_id: Uuid,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub subject: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    pub warning_sent: bool,
    pub is_escalated: bool,
    #[schema(value_type = String, example = "2026-01-03T12:00:00Z")]
    pub sla_deadline: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2026-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2026-01-01T12:05:00Z")]
    pub updated_at: DateTimeWithTimeZone,
    /// Present on single-ticket reads, in insertion order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<TicketMessageResponse>>,
}

impl From<Model> for TicketResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            ticket_id: model.ticket_id,
            user_id: model.user_id,
            category: model.category,
            priority: model.priority,
            status: model.status,
            subject: model.subject,
            query: model.query,
            ai_response: model.ai_response,
            policy_id: model.policy_id,
            claim_id: model.claim_id,
            assigned_to: model.assigned_to,
            warning_sent: model.warning_sent,
            is_escalated: model.is_escalated,
            sla_deadline: model.sla_deadline,
            created_at: model.created_at,
            updated_at: model.updated_at,
            messages: None,
        }
    }
}

impl TicketResponse {
    pub fn with_messages(mut self, messages: Vec<TicketMessageResponse>) -> Self {
        self.messages = Some(messages);
        self
    }
}

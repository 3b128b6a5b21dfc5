//! Ticket message entity model
//!
//! Messages form the append-only conversation thread of a ticket. The
//! auto-increment key defines thread order.

use sea_orm::{ActiveModelBehavior, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ticket_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub ticket_pk: Uuid,
    pub sender_id: Uuid,
    pub body: String,

    /// Opaque attachment references (document ids or URLs)
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ticket::Entity",
        from = "Column::TicketPk",
        to = "super::ticket::Column::Id",
        on_delete = "Cascade"
    )]
    Ticket,
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketMessageResponse {
    pub id: i32,
    pub sender_id: Uuid,
    pub body: String,
    pub attachments: Vec<String>,
    #[schema(value_type = String, example = "2026-01-01T12:05:00Z")]
    pub created_at: DateTimeWithTimeZone,
}

impl From<Model> for TicketMessageResponse {
    fn from(model: Model) -> Self {
        let attachments = serde_json::from_value(model.attachments).unwrap_or_default();
        Self {
            id: model.id,
            sender_id: model.sender_id,
            body: model.body,
            attachments,
            created_at: model.created_at,
        }
    }
}

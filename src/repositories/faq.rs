//! # FAQ Repository
//!
//! Storage for the knowledge base the chat pipeline ranks against.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::TicketError;
use crate::models::faq_entry::{ActiveModel, Column, Entity, Model};
use crate::models::ticket::TicketCategory;

#[derive(Debug, Clone)]
pub struct NewFaqEntry {
    pub question: String,
    pub answer: String,
    pub category: TicketCategory,
    pub embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct FaqRepository {
    db: DatabaseConnection,
}

impl FaqRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Entries eligible for retrieval.
    pub async fn list_active(&self) -> Result<Vec<Model>, TicketError> {
        self.list(true).await
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Model>, TicketError> {
        let mut query = Entity::find();
        if active_only {
            query = query.filter(Column::IsActive.eq(true));
        }

        Ok(query
            .order_by_asc(Column::Category)
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn create(&self, entry: NewFaqEntry, now: DateTime<Utc>) -> Result<Model, TicketError> {
        let now = now.fixed_offset();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            question: Set(entry.question),
            answer: Set(entry.answer),
            category: Set(entry.category),
            is_active: Set(true),
            embedding: Set(serde_json::json!(entry.embedding)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(
            faq_id = %model.id,
            category = %model.category,
            dimensions = model.embedding.as_array().map_or(0, Vec::len),
            "FAQ entry created"
        );

        Ok(model)
    }

    pub async fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Model, TicketError> {
        let entry = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TicketError::NotFound {
                entity: "faq entry",
                reference: id.to_string(),
            })?;

        let mut active: ActiveModel = entry.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(now.fixed_offset());

        Ok(active.update(&self.db).await?)
    }
}

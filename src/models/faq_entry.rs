//! # FAQ Entry Model
//!
//! Curated question/answer pairs used as retrieval context by the chat
//! deflection pipeline. Each entry carries the embedding of its question.

use sea_orm::{ActiveModelBehavior, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ticket::TicketCategory;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "faq_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub question: String,
    pub answer: String,
    pub category: TicketCategory,
    pub is_active: bool,

    /// JSON array of f32, dimensionality fixed by the embedding provider
    #[sea_orm(column_type = "JsonBinary")]
    pub embedding: Json,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decodes the stored embedding. Malformed values decode to an empty vector,
    /// which ranking treats as unusable.
    pub fn embedding_vector(&self) -> Vec<f32> {
        serde_json::from_value(self.embedding.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FaqEntryResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: TicketCategory,
    pub is_active: bool,
    /// Length of the stored embedding
    pub embedding_dimensions: usize,
    #[schema(value_type = String, example = "2026-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2026-01-01T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
}

impl From<Model> for FaqEntryResponse {
    fn from(model: Model) -> Self {
        let embedding_dimensions = model.embedding.as_array().map_or(0, Vec::len);
        Self {
            id: model.id,
            question: model.question,
            answer: model.answer,
            category: model.category,
            is_active: model.is_active,
            embedding_dimensions,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

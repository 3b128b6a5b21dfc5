//! # FAQ Endpoint Handlers
//!
//! Maintenance of the knowledge base the chat assistant answers from.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::ai::ProviderError;
use crate::auth::{Caller, CallerHeaders};
use crate::error::{ApiError, validation_error};
use crate::models::faq_entry::FaqEntryResponse;
use crate::models::ticket::TicketCategory;
use crate::repositories::NewFaqEntry;
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    pub category: TicketCategory,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListFaqsQuery {
    /// Only return entries used for answering (default: false)
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetFaqActiveRequest {
    pub is_active: bool,
}

/// Add an FAQ entry, embedding its question (admins)
#[utoipa::path(
    post,
    path = "/faqs",
    params(CallerHeaders),
    request_body = CreateFaqRequest,
    responses(
        (status = 201, description = "FAQ entry created", body = FaqEntryResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 502, description = "Embedding provider failed", body = ApiError),
        (status = 503, description = "Embedding provider not configured", body = ApiError)
    ),
    tag = "faqs"
)]
pub async fn create_faq(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateFaqRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FaqEntryResponse>), ApiError> {
    caller.require_admin()?;
    let Json(request) = payload?;

    let question = request.question.trim().to_string();
    let answer = request.answer.trim().to_string();
    if question.is_empty() || answer.is_empty() {
        return Err(validation_error(
            "Question and answer are required",
            serde_json::json!({ "question": "Must not be empty", "answer": "Must not be empty" }),
        ));
    }

    let timeout = state.config.ai.timeout();
    let embedding = tokio::time::timeout(timeout, state.embedder.embed(&question))
        .await
        .map_err(|_| ProviderError::Timeout(timeout))??;

    let entry = state
        .faqs()
        .create(
            NewFaqEntry {
                question,
                answer,
                category: request.category,
                embedding,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// List FAQ entries (agents and admins)
#[utoipa::path(
    get,
    path = "/faqs",
    params(CallerHeaders, ListFaqsQuery),
    responses(
        (status = 200, description = "FAQ entries", body = Vec<FaqEntryResponse>),
        (status = 403, description = "Caller is not an agent", body = ApiError)
    ),
    tag = "faqs"
)]
pub async fn list_faqs(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<ListFaqsQuery>, QueryRejection>,
) -> Result<Json<Vec<FaqEntryResponse>>, ApiError> {
    caller.require_privileged()?;
    let Query(query) = query?;

    let entries = state.faqs().list(query.active_only).await?;
    Ok(Json(entries.into_iter().map(FaqEntryResponse::from).collect()))
}

/// Enable or disable an FAQ entry (admins)
#[utoipa::path(
    patch,
    path = "/faqs/{id}/active",
    params(
        CallerHeaders,
        ("id" = Uuid, Path, description = "FAQ entry ID")
    ),
    request_body = SetFaqActiveRequest,
    responses(
        (status = 200, description = "FAQ entry updated", body = FaqEntryResponse),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 404, description = "FAQ entry not found", body = ApiError)
    ),
    tag = "faqs"
)]
pub async fn set_faq_active(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    payload: Result<Json<SetFaqActiveRequest>, JsonRejection>,
) -> Result<Json<FaqEntryResponse>, ApiError> {
    caller.require_admin()?;
    let Json(request) = payload?;

    let entry = state
        .faqs()
        .set_active(id, request.is_active, Utc::now())
        .await?;

    Ok(Json(entry.into()))
}

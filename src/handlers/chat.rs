//! # Chat Endpoint Handler
//!
//! Answers customer questions from the FAQ corpus, opening a ticket when no
//! reliable answer exists.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{Caller, CallerHeaders};
use crate::chat::ChatOutcome;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatQueryRequest {
    #[schema(example = "Does my plan cover rental cars after an accident?")]
    pub query: String,
}

/// Ask the support assistant
#[utoipa::path(
    post,
    path = "/chat/query",
    params(CallerHeaders),
    request_body = ChatQueryRequest,
    responses(
        (status = 200, description = "Answered from the FAQ, or handed off with a ticket", body = ChatOutcome, example = json!({
            "answer": "Rental cars are covered for up to 10 days after a covered accident.",
            "status": "resolved",
            "score": 0.87
        })),
        (status = 400, description = "Empty query", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "chat"
)]
pub async fn chat_query(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<ChatQueryRequest>, JsonRejection>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let Json(request) = payload?;

    let outcome = state
        .pipeline()
        .handle_query(caller.user_id, caller.email.clone(), &request.query)
        .await?;

    Ok(Json(outcome))
}

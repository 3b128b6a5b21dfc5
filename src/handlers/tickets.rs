//! # Ticket Endpoint Handlers
//!
//! Creation, listing, threads and the support-side mutations (status,
//! assignment, priority). Requesters only ever see their own tickets; a ticket
//! owned by someone else reads as not found.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{Caller, CallerHeaders};
use crate::error::{ApiError, TicketError};
use crate::handlers::types::{Page, PageParams};
use crate::models::ticket::{
    Model as Ticket, TicketCategory, TicketPriority, TicketResponse, TicketStatus,
};
use crate::models::ticket_message::TicketMessageResponse;
use crate::repositories::TicketFilter;
use crate::server::AppState;
use crate::tickets::CreateTicket;

/// Request body for opening a ticket
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTicketRequest {
    #[schema(example = "Windshield crack after hailstorm")]
    pub subject: String,
    /// Full description of the problem; also accepted as `description`
    #[serde(alias = "description")]
    pub query: String,
    pub category: TicketCategory,
    /// `LOW`, `MEDIUM`, `HIGH` or `EMERGENCY` (`URGENT` accepted); anything else is LOW
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub policy_id: Option<Uuid>,
    #[serde(default)]
    pub claim_id: Option<Uuid>,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTicketsQuery {
    /// Filter by status
    pub status: Option<TicketStatus>,
    /// Case-insensitive match against the subject
    pub search: Option<String>,
    /// Requester filter, honoured for agents and admins only
    pub user_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMessageRequest {
    pub body: String,
    /// Opaque references to previously uploaded files
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignTicketRequest {
    /// Agent taking the ticket; defaults to the caller
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    /// Where SLA warnings for this ticket go; defaults to the caller's email when
    /// self-assigning
    #[serde(default)]
    pub agent_email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePriorityRequest {
    pub priority: TicketPriority,
}

/// Loads a ticket the caller is allowed to see.
async fn load_visible(state: &AppState, caller: &Caller, reference: &str) -> Result<Ticket, ApiError> {
    let ticket = state.tickets().find(reference).await?;
    if !caller.can_access(ticket.user_id) {
        return Err(TicketError::ticket_not_found(reference).into());
    }
    Ok(ticket)
}

/// Open a ticket
#[utoipa::path(
    post,
    path = "/tickets",
    params(CallerHeaders),
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = TicketResponse),
        (status = 400, description = "Invalid request", body = ApiError, example = json!({
            "code": "VALIDATION_FAILED",
            "message": "subject cannot be empty",
            "details": { "subject": "subject cannot be empty" },
            "trace_id": "corr-12345678"
        })),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let Json(request) = payload?;

    let ticket = state
        .tickets()
        .create(
            caller.user_id,
            caller.email.clone(),
            CreateTicket {
                subject: request.subject,
                query: request.query,
                category: request.category,
                priority: request.priority,
                policy_id: request.policy_id,
                claim_id: request.claim_id,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

/// List tickets, newest first
#[utoipa::path(
    get,
    path = "/tickets",
    params(CallerHeaders, ListTicketsQuery),
    responses(
        (status = 200, description = "Tickets listed", body = Page<TicketResponse>),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<ListTicketsQuery>, QueryRejection>,
) -> Result<Json<Page<TicketResponse>>, ApiError> {
    let Query(query) = query?;
    let (page, limit) = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve()?;

    let user_id = if caller.is_privileged() {
        query.user_id
    } else {
        Some(caller.user_id)
    };

    let filter = TicketFilter {
        user_id,
        status: query.status,
        search: query.search,
    };

    let (tickets, total) = state.tickets().list(&filter, page, limit).await?;
    let items = tickets.into_iter().map(TicketResponse::from).collect();

    Ok(Json(Page::new(items, total, page, limit)))
}

/// Fetch a ticket with its message thread
#[utoipa::path(
    get,
    path = "/tickets/{id}",
    params(
        CallerHeaders,
        ("id" = String, Path, description = "Ticket UUID or TKT- code")
    ),
    responses(
        (status = 200, description = "Ticket found", body = TicketResponse),
        (status = 404, description = "Ticket not found", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let service = state.tickets();
    let ticket = load_visible(&state, &caller, &reference).await?;
    let messages = service
        .messages(&ticket)
        .await?
        .into_iter()
        .map(TicketMessageResponse::from)
        .collect();

    Ok(Json(TicketResponse::from(ticket).with_messages(messages)))
}

/// Reply on a ticket thread
#[utoipa::path(
    post,
    path = "/tickets/{id}/messages",
    params(
        CallerHeaders,
        ("id" = String, Path, description = "Ticket UUID or TKT- code")
    ),
    request_body = AddMessageRequest,
    responses(
        (status = 201, description = "Message appended", body = TicketResponse),
        (status = 400, description = "Invalid message or ticket closed", body = ApiError, example = json!({
            "code": "TICKET_CLOSED",
            "message": "ticket TKT-7Q2MZK4A is closed",
            "trace_id": "corr-12345678"
        })),
        (status = 404, description = "Ticket not found", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn add_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
    payload: Result<Json<AddMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let Json(request) = payload?;
    let service = state.tickets();
    let ticket = load_visible(&state, &caller, &reference).await?;

    let updated = service
        .reply(
            &ticket,
            caller.user_id,
            &request.body,
            request.attachments,
            Utc::now(),
        )
        .await?;
    let messages = service
        .messages(&updated)
        .await?
        .into_iter()
        .map(TicketMessageResponse::from)
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(TicketResponse::from(updated).with_messages(messages)),
    ))
}

/// Move a ticket through its lifecycle (agents and admins)
#[utoipa::path(
    patch,
    path = "/tickets/{id}/status",
    params(
        CallerHeaders,
        ("id" = String, Path, description = "Ticket UUID or TKT- code")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = TicketResponse),
        (status = 400, description = "Transition not allowed", body = ApiError, example = json!({
            "code": "INVALID_TRANSITION",
            "message": "cannot move ticket from CLOSED to OPEN",
            "details": { "from": "CLOSED", "to": "OPEN" },
            "trace_id": "corr-12345678"
        })),
        (status = 403, description = "Caller is not an agent", body = ApiError),
        (status = 404, description = "Ticket not found", body = ApiError),
        (status = 409, description = "Status changed concurrently", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<TicketResponse>, ApiError> {
    caller.require_privileged()?;
    let Json(request) = payload?;
    let service = state.tickets();

    let ticket = service.find(&reference).await?;
    let updated = service.transition(&ticket, request.status, Utc::now()).await?;

    Ok(Json(updated.into()))
}

/// Assign a ticket to an agent (agents and admins)
#[utoipa::path(
    patch,
    path = "/tickets/{id}/assign",
    params(
        CallerHeaders,
        ("id" = String, Path, description = "Ticket UUID or TKT- code")
    ),
    request_body = AssignTicketRequest,
    responses(
        (status = 200, description = "Ticket assigned", body = TicketResponse),
        (status = 400, description = "Invalid request or ticket closed", body = ApiError),
        (status = 403, description = "Caller is not an agent", body = ApiError),
        (status = 404, description = "Ticket not found", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn assign_ticket(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
    payload: Result<Json<AssignTicketRequest>, JsonRejection>,
) -> Result<Json<TicketResponse>, ApiError> {
    caller.require_privileged()?;
    let Json(request) = payload?;
    let service = state.tickets();

    let agent_id = request.agent_id.unwrap_or(caller.user_id);
    let agent_email = match request.agent_email {
        Some(email) => Some(email),
        None if agent_id == caller.user_id => caller.email.clone(),
        None => None,
    };

    let ticket = service.find(&reference).await?;
    let updated = service
        .assign(&ticket, agent_id, agent_email, Utc::now())
        .await?;

    Ok(Json(updated.into()))
}

/// Change a ticket's priority (agents and admins). The SLA deadline is kept.
#[utoipa::path(
    patch,
    path = "/tickets/{id}/priority",
    params(
        CallerHeaders,
        ("id" = String, Path, description = "Ticket UUID or TKT- code")
    ),
    request_body = UpdatePriorityRequest,
    responses(
        (status = 200, description = "Priority updated", body = TicketResponse),
        (status = 400, description = "Invalid request or ticket closed", body = ApiError),
        (status = 403, description = "Caller is not an agent", body = ApiError),
        (status = 404, description = "Ticket not found", body = ApiError)
    ),
    tag = "tickets"
)]
pub async fn update_priority(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
    payload: Result<Json<UpdatePriorityRequest>, JsonRejection>,
) -> Result<Json<TicketResponse>, ApiError> {
    caller.require_privileged()?;
    let Json(request) = payload?;
    let service = state.tickets();

    let ticket = service.find(&reference).await?;
    let updated = service
        .reprioritize(&ticket, request.priority, Utc::now())
        .await?;

    Ok(Json(updated.into()))
}

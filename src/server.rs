//! # Server Configuration
//!
//! Router assembly, shared application state and the HTTP server lifecycle.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ai::{CompletionProvider, EmbeddingProvider};
use crate::auth::caller_middleware;
use crate::chat::DeflectionPipeline;
use crate::config::AppConfig;
use crate::handlers;
use crate::mail::EmailDispatcher;
use crate::repositories::{FaqRepository, TicketRepository};
use crate::telemetry::trace_context_middleware;
use crate::tickets::TicketService;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub mailer: Arc<dyn EmailDispatcher>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub completer: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn tickets(&self) -> TicketService {
        TicketService::new(TicketRepository::new(self.db.clone()), self.mailer.clone())
    }

    pub fn faqs(&self) -> FaqRepository {
        FaqRepository::new(self.db.clone())
    }

    pub fn pipeline(&self) -> DeflectionPipeline {
        DeflectionPipeline::new(
            TicketRepository::new(self.db.clone()),
            self.faqs(),
            self.embedder.clone(),
            self.completer.clone(),
            self.config.ai.timeout(),
        )
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/tickets",
            post(handlers::tickets::create_ticket).get(handlers::tickets::list_tickets),
        )
        .route("/tickets/{id}", get(handlers::tickets::get_ticket))
        .route("/tickets/{id}/messages", post(handlers::tickets::add_message))
        .route("/tickets/{id}/status", patch(handlers::tickets::update_status))
        .route("/tickets/{id}/assign", patch(handlers::tickets::assign_ticket))
        .route("/tickets/{id}/priority", patch(handlers::tickets::update_priority))
        .route("/chat/query", post(handlers::chat::chat_query))
        .route(
            "/faqs",
            post(handlers::faqs::create_faq).get(handlers::faqs::list_faqs),
        )
        .route("/faqs/{id}/active", patch(handlers::faqs::set_faq_active))
        .route_layer(middleware::from_fn(caller_middleware));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the API until `shutdown` fires.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state.config.bind_addr()?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::tickets::create_ticket,
        crate::handlers::tickets::list_tickets,
        crate::handlers::tickets::get_ticket,
        crate::handlers::tickets::add_message,
        crate::handlers::tickets::update_status,
        crate::handlers::tickets::assign_ticket,
        crate::handlers::tickets::update_priority,
        crate::handlers::chat::chat_query,
        crate::handlers::faqs::create_faq,
        crate::handlers::faqs::list_faqs,
        crate::handlers::faqs::set_faq_active,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::error::ApiError,
            crate::models::ticket::TicketResponse,
            crate::models::ticket::TicketStatus,
            crate::models::ticket::TicketPriority,
            crate::models::ticket::TicketCategory,
            crate::models::ticket_message::TicketMessageResponse,
            crate::models::faq_entry::FaqEntryResponse,
            crate::handlers::tickets::CreateTicketRequest,
            crate::handlers::tickets::AddMessageRequest,
            crate::handlers::tickets::UpdateStatusRequest,
            crate::handlers::tickets::AssignTicketRequest,
            crate::handlers::tickets::UpdatePriorityRequest,
            crate::handlers::chat::ChatQueryRequest,
            crate::chat::ChatOutcome,
            crate::chat::ChatStatus,
            crate::handlers::faqs::CreateFaqRequest,
            crate::handlers::faqs::SetFaqActiveRequest,
        )
    ),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "tickets", description = "Support ticket lifecycle"),
        (name = "chat", description = "AI chat deflection"),
        (name = "faqs", description = "FAQ knowledge base")
    ),
    info(
        title = "Coverdesk API",
        description = "Support tickets, SLA escalation and FAQ-grounded chat for the insurance app",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

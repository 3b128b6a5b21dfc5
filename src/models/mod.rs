//! # Data Models
//!
//! SeaORM entities and API representations for tickets, their message
//! threads and the FAQ knowledge base.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod faq_entry;
pub mod ticket;
pub mod ticket_message;

pub use faq_entry::Entity as FaqEntry;
pub use ticket::Entity as Ticket;
pub use ticket_message::Entity as TicketMessage;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "coverdesk".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

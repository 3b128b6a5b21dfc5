//! Ticket lifecycle: SLA deadlines, the status state machine and the service
//! that applies changes and sends the resulting notices.

pub mod deadline;
pub mod service;
pub mod state_machine;

pub use deadline::compute_deadline;
pub use service::{CreateTicket, TicketService};
pub use state_machine::{can_transition, ensure_transition};

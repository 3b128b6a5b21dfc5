//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations for tickets, their threads and
//! the FAQ knowledge base.

pub mod faq;
pub mod ticket;

pub use faq::{FaqRepository, NewFaqEntry};
pub use ticket::{NewTicket, TicketFilter, TicketRepository};

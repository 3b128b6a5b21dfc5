//! # Coverdesk Library
//!
//! Support-ticket lifecycle, SLA escalation and FAQ-grounded chat deflection
//! for the insurance app's support desk.

pub mod ai;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod escalation;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub mod tickets;
pub use migration;

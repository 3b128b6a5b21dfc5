//! Database migrations for the Coverdesk support service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_090000_create_tickets;
mod m2026_01_05_090100_create_ticket_messages;
mod m2026_01_12_140000_create_faq_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_090000_create_tickets::Migration),
            Box::new(m2026_01_05_090100_create_ticket_messages::Migration),
            Box::new(m2026_01_12_140000_create_faq_entries::Migration),
        ]
    }
}

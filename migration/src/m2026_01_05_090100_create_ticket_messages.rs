//! Migration to create the ticket_messages table.
//!
//! Messages are append-only; the auto-increment key is the thread order.

use sea_orm_migration::prelude::*;

use crate::m2026_01_05_090000_create_tickets::Tickets;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TicketMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TicketMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TicketMessages::TicketPk).uuid().not_null())
                    .col(ColumnDef::new(TicketMessages::SenderId).uuid().not_null())
                    .col(ColumnDef::new(TicketMessages::Body).text().not_null())
                    .col(ColumnDef::new(TicketMessages::Attachments).json_binary().not_null())
                    .col(
                        ColumnDef::new(TicketMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_messages_ticket_pk")
                            .from(TicketMessages::Table, TicketMessages::TicketPk)
                            .to(Tickets::Table, Tickets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_messages_ticket_pk")
                    .table(TicketMessages::Table)
                    .col(TicketMessages::TicketPk)
                    .col(TicketMessages::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_ticket_messages_ticket_pk")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(TicketMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TicketMessages {
    Table,
    Id,
    TicketPk,
    SenderId,
    Body,
    Attachments,
    CreatedAt,
}

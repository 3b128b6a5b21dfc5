//! Migration to create the tickets table.
//!
//! Tickets carry their SLA deadline and the two escalation flags the sweeper
//! uses as idempotence guards, so the sweep indexes cover those columns.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tickets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tickets::TicketId).text().not_null())
                    .col(ColumnDef::new(Tickets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Tickets::RequesterEmail).text().null())
                    .col(ColumnDef::new(Tickets::Category).text().not_null())
                    .col(
                        ColumnDef::new(Tickets::Priority)
                            .text()
                            .not_null()
                            .default("LOW"),
                    )
                    .col(
                        ColumnDef::new(Tickets::Status)
                            .text()
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(ColumnDef::new(Tickets::Subject).text().not_null())
                    .col(ColumnDef::new(Tickets::Query).text().not_null())
                    .col(ColumnDef::new(Tickets::AiResponse).text().null())
                    .col(ColumnDef::new(Tickets::PolicyId).uuid().null())
                    .col(ColumnDef::new(Tickets::ClaimId).uuid().null())
                    .col(ColumnDef::new(Tickets::AssignedTo).uuid().null())
                    .col(ColumnDef::new(Tickets::AssigneeEmail).text().null())
                    .col(
                        ColumnDef::new(Tickets::WarningSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::IsEscalated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::SlaDeadline)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_ticket_id_unique")
                    .table(Tickets::Table)
                    .col(Tickets::TicketId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Requester-scoped listings
        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_user_created")
                    .table(Tickets::Table)
                    .col(Tickets::UserId)
                    .col(Tickets::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Escalation sweep candidates
        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_sweep")
                    .table(Tickets::Table)
                    .col(Tickets::Status)
                    .col(Tickets::IsEscalated)
                    .col(Tickets::WarningSent)
                    .col(Tickets::SlaDeadline)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx_tickets_ticket_id_unique",
            "idx_tickets_user_created",
            "idx_tickets_sweep",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Tickets {
    Table,
    Id,
    TicketId,
    UserId,
    RequesterEmail,
    Category,
    Priority,
    Status,
    Subject,
    Query,
    AiResponse,
    PolicyId,
    ClaimId,
    AssignedTo,
    AssigneeEmail,
    WarningSent,
    IsEscalated,
    SlaDeadline,
    CreatedAt,
    UpdatedAt,
}

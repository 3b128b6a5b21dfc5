//! Migration to create the faq_entries table.
//!
//! Each entry stores the precomputed embedding of its question as a JSON array.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FaqEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FaqEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FaqEntries::Question).text().not_null())
                    .col(ColumnDef::new(FaqEntries::Answer).text().not_null())
                    .col(ColumnDef::new(FaqEntries::Category).text().not_null())
                    .col(
                        ColumnDef::new(FaqEntries::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(FaqEntries::Embedding).json_binary().not_null())
                    .col(
                        ColumnDef::new(FaqEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(FaqEntries::UpdatedAt)
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
                    .name("idx_faq_entries_active")
                    .table(FaqEntries::Table)
                    .col(FaqEntries::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_faq_entries_active").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(FaqEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FaqEntries {
    Table,
    Id,
    Question,
    Answer,
    Category,
    IsActive,
    Embedding,
    CreatedAt,
    UpdatedAt,
}

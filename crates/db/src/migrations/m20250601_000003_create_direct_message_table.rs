//! Create `direct_message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DirectMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DirectMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DirectMessage::FromId).string_len(32).not_null())
                    .col(ColumnDef::new(DirectMessage::ToId).string_len(32).not_null())
                    .col(ColumnDef::new(DirectMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(DirectMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_direct_message_from")
                            .from(DirectMessage::Table, DirectMessage::FromId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_direct_message_to")
                            .from(DirectMessage::Table, DirectMessage::ToId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Conversation lookups hit both orientations
        manager
            .create_index(
                Index::create()
                    .name("idx_direct_message_from_to_created")
                    .table(DirectMessage::Table)
                    .col(DirectMessage::FromId)
                    .col(DirectMessage::ToId)
                    .col(DirectMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_direct_message_to_from_created")
                    .table(DirectMessage::Table)
                    .col(DirectMessage::ToId)
                    .col(DirectMessage::FromId)
                    .col(DirectMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DirectMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DirectMessage {
    Table,
    Id,
    FromId,
    ToId,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

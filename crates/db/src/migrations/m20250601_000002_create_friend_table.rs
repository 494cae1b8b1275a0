//! Create friend table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Friend::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Friend::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Friend::FromId).string_len(32).not_null())
                    .col(ColumnDef::new(Friend::ToId).string_len(32).not_null())
                    .col(ColumnDef::new(Friend::PairKey).string_len(65).not_null())
                    .col(
                        ColumnDef::new(Friend::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Friend::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Friend::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friend_from")
                            .from(Friend::Table, Friend::FromId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friend_to")
                            .from(Friend::Table, Friend::ToId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One record per unordered pair, whichever side sent it
        manager
            .create_index(
                Index::create()
                    .name("idx_friend_pair_key")
                    .table(Friend::Table)
                    .col(Friend::PairKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_friend_from_id_status")
                    .table(Friend::Table)
                    .col(Friend::FromId)
                    .col(Friend::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_friend_to_id_status")
                    .table(Friend::Table)
                    .col(Friend::ToId)
                    .col(Friend::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Friend::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Friend {
    Table,
    Id,
    FromId,
    ToId,
    PairKey,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

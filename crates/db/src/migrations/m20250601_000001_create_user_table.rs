//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::Name).string_len(128).not_null())
                    .col(ColumnDef::new(User::NameLower).string_len(128).not_null())
                    .col(ColumnDef::new(User::Email).string_len(256).not_null())
                    .col(
                        ColumnDef::new(User::IsVerifiedStudent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(User::PasswordHash).string_len(256))
                    .col(ColumnDef::new(User::Token).string_len(64))
                    .col(
                        ColumnDef::new(User::FavoriteSports)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_email")
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_token")
                    .table(User::Table)
                    .col(User::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Substring search on lowercased names
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE EXTENSION IF NOT EXISTS pg_trgm;
                CREATE INDEX IF NOT EXISTS idx_user_name_lower_trgm
                ON "user"
                USING GIN (name_lower gin_trgm_ops);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Name,
    NameLower,
    Email,
    IsVerifiedStudent,
    PasswordHash,
    Token,
    FavoriteSports,
    CreatedAt,
    UpdatedAt,
}

//! Create game, `game_player`, `game_invite`, and `game_chat_message` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create game table
        manager
            .create_table(
                Table::create()
                    .table(Game::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Game::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Game::Sport).string_len(20).not_null())
                    .col(ColumnDef::new(Game::CustomSportName).string_len(64))
                    .col(ColumnDef::new(Game::Location).string_len(256).not_null())
                    .col(ColumnDef::new(Game::Time).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Game::MaxPlayers).integer().not_null())
                    .col(
                        ColumnDef::new(Game::PlayersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Game::HostId).string_len(32).not_null())
                    .col(ColumnDef::new(Game::HostName).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Game::SkillLevel)
                            .string_len(20)
                            .not_null()
                            .default("any"),
                    )
                    .col(ColumnDef::new(Game::Description).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Game::Status)
                            .string_len(20)
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(ColumnDef::new(Game::Visibility).string_len(20))
                    .col(ColumnDef::new(Game::InviteCode).string_len(16))
                    .col(
                        ColumnDef::new(Game::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Game::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_host")
                            .from(Game::Table, Game::HostId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Feed: status + time, filtered by visibility
        manager
            .create_index(
                Index::create()
                    .name("idx_game_status_time")
                    .table(Game::Table)
                    .col(Game::Status)
                    .col(Game::Time)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_host_id")
                    .table(Game::Table)
                    .col(Game::HostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_sport")
                    .table(Game::Table)
                    .col(Game::Sport)
                    .to_owned(),
            )
            .await?;

        // Create game_player table
        manager
            .create_table(
                Table::create()
                    .table(GamePlayer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GamePlayer::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GamePlayer::GameId).string_len(32).not_null())
                    .col(ColumnDef::new(GamePlayer::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(GamePlayer::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(GamePlayer::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_player_game")
                            .from(GamePlayer::Table, GamePlayer::GameId)
                            .to(Game::Table, Game::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_player_user")
                            .from(GamePlayer::Table, GamePlayer::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A user holds at most one slot per game; join relies on this for ON CONFLICT
        manager
            .create_index(
                Index::create()
                    .name("idx_game_player_game_user")
                    .table(GamePlayer::Table)
                    .col(GamePlayer::GameId)
                    .col(GamePlayer::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_player_user_id")
                    .table(GamePlayer::Table)
                    .col(GamePlayer::UserId)
                    .to_owned(),
            )
            .await?;

        // Create game_invite table
        manager
            .create_table(
                Table::create()
                    .table(GameInvite::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameInvite::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameInvite::GameId).string_len(32).not_null())
                    .col(ColumnDef::new(GameInvite::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(GameInvite::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_invite_game")
                            .from(GameInvite::Table, GameInvite::GameId)
                            .to(Game::Table, Game::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_invite_user")
                            .from(GameInvite::Table, GameInvite::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_invite_game_user")
                    .table(GameInvite::Table)
                    .col(GameInvite::GameId)
                    .col(GameInvite::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create game_chat_message table
        manager
            .create_table(
                Table::create()
                    .table(GameChatMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameChatMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameChatMessage::GameId).string_len(32).not_null())
                    .col(ColumnDef::new(GameChatMessage::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(GameChatMessage::UserName).string_len(128).not_null())
                    .col(ColumnDef::new(GameChatMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(GameChatMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_chat_message_game")
                            .from(GameChatMessage::Table, GameChatMessage::GameId)
                            .to(Game::Table, Game::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_game_chat_message_game_created")
                    .table(GameChatMessage::Table)
                    .col(GameChatMessage::GameId)
                    .col(GameChatMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameChatMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameInvite::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GamePlayer::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Game::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Game {
    Table,
    Id,
    Sport,
    CustomSportName,
    Location,
    Time,
    MaxPlayers,
    PlayersCount,
    HostId,
    HostName,
    SkillLevel,
    Description,
    Status,
    Visibility,
    InviteCode,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GamePlayer {
    Table,
    Id,
    GameId,
    UserId,
    Name,
    JoinedAt,
}

#[derive(Iden)]
enum GameInvite {
    Table,
    Id,
    GameId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum GameChatMessage {
    Table,
    Id,
    GameId,
    UserId,
    UserName,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

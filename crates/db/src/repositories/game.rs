//! Game repository.
//!
//! Roster changes (`create`, `join`, `leave`) run in a transaction that keeps
//! `game.players_count` equal to the number of `game_player` rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pickup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, OnConflict, Query, SimpleExpr},
};
use tracing::warn;

use crate::entities::game::{GameStatus, GameVisibility, SportId};
use crate::entities::{
    Game, GameChatMessage, GameInvite, GamePlayer, game, game_chat_message, game_invite,
    game_player,
};

/// Result of an attempt to take a roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Player row and announcement were committed.
    Joined,
    /// The game no longer exists.
    GameMissing,
    /// No free slot.
    Full,
    /// The user already holds a slot.
    AlreadyJoined,
}

/// Repository for games, rosters, invites and game chat.
#[derive(Clone)]
pub struct GameRepository {
    db: Arc<DatabaseConnection>,
}

/// Games the user holds a roster slot in.
fn has_player(user_id: &str) -> SimpleExpr {
    game::Column::Id.in_subquery(
        Query::select()
            .column(game_player::Column::GameId)
            .from(GamePlayer)
            .and_where(game_player::Column::UserId.eq(user_id))
            .to_owned(),
    )
}

impl GameRepository {
    /// Create a new game repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Game Operations ====================

    /// Find game by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<game::Model>> {
        Game::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get game by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<game::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {id}")))
    }

    /// Insert a game together with its host's roster slot.
    pub async fn create(
        &self,
        model: game::ActiveModel,
        host: game_player::ActiveModel,
    ) -> AppResult<game::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        GamePlayer::insert(host)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Take a roster slot and post the join announcement, all or nothing.
    ///
    /// The slot is claimed with a conditional increment on `players_count`, so
    /// concurrent joins on the same game serialize on the row lock and can never
    /// push the roster past `max_players`.
    pub async fn join(
        &self,
        game_id: &str,
        player: game_player::ActiveModel,
        announcement: game_chat_message::ActiveModel,
    ) -> AppResult<JoinOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let claimed = Game::update_many()
            .col_expr(
                game::Column::PlayersCount,
                Expr::col(game::Column::PlayersCount).add(1),
            )
            .filter(game::Column::Id.eq(game_id))
            .filter(Expr::col(game::Column::PlayersCount).lt(Expr::col(game::Column::MaxPlayers)))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if claimed.rows_affected == 0 {
            let exists = Game::find_by_id(game_id)
                .one(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .is_some();
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(if exists {
                JoinOutcome::Full
            } else {
                JoinOutcome::GameMissing
            });
        }

        let inserted = GamePlayer::insert(player)
            .on_conflict(
                OnConflict::columns([game_player::Column::GameId, game_player::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(JoinOutcome::AlreadyJoined);
        }

        GameChatMessage::insert(announcement)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(JoinOutcome::Joined)
    }

    /// Release the user's roster slot. Returns false if they held none.
    pub async fn leave(&self, game_id: &str, user_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = GamePlayer::delete_many()
            .filter(game_player::Column::GameId.eq(game_id))
            .filter(game_player::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if removed.rows_affected > 0 {
            let updated = Game::update_many()
                .col_expr(
                    game::Column::PlayersCount,
                    Expr::col(game::Column::PlayersCount).sub(1),
                )
                .filter(game::Column::Id.eq(game_id))
                .filter(game::Column::PlayersCount.gt(0))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            if updated.rows_affected == 0 {
                warn!(game_id = %game_id, user_id = %user_id, "players_count already zero on leave");
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(removed.rows_affected > 0)
    }

    /// Apply host edits. When `max_players` shrinks, the write only lands if the
    /// current roster still fits. Returns false if nothing was updated.
    pub async fn update_details(
        &self,
        id: &str,
        changes: game::ActiveModel,
        max_players: Option<i32>,
    ) -> AppResult<bool> {
        let mut update = Game::update_many()
            .set(changes)
            .filter(game::Column::Id.eq(id));

        if let Some(max) = max_players {
            update = update.filter(game::Column::PlayersCount.lte(max));
        }

        let result = update
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete a game permanently. Players, invites and chat cascade.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Game::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    // ==================== Listings ====================

    /// Upcoming public games, soonest first.
    pub async fn find_public_feed(
        &self,
        sport: Option<SportId>,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<game::Model>> {
        let mut query = Game::find()
            .filter(game::Column::Status.eq(GameStatus::Upcoming))
            .filter(game::Column::Time.gt(now))
            .filter(
                Condition::any()
                    .add(game::Column::Visibility.is_null())
                    .add(game::Column::Visibility.eq(GameVisibility::Public)),
            );

        if let Some(sport) = sport {
            query = query.filter(game::Column::Sport.eq(sport));
        }

        query
            .order_by_asc(game::Column::Time)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upcoming games the user plays in, private ones included.
    pub async fn find_upcoming_for_player(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<game::Model>> {
        Game::find()
            .filter(game::Column::Status.eq(GameStatus::Upcoming))
            .filter(game::Column::Time.gt(now))
            .filter(has_player(user_id))
            .order_by_asc(game::Column::Time)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upcoming games hosted by the user.
    pub async fn find_hosted_upcoming(&self, host_id: &str) -> AppResult<Vec<game::Model>> {
        Game::find()
            .filter(game::Column::HostId.eq(host_id))
            .filter(game::Column::Status.eq(GameStatus::Upcoming))
            .order_by_asc(game::Column::Time)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Past games the user played in, most recent first.
    pub async fn find_history(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<game::Model>> {
        Game::find()
            .filter(game::Column::Time.lt(now))
            .filter(has_player(user_id))
            .order_by_desc(game::Column::Time)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count of past games the user played in (same predicate as `find_history`).
    pub async fn count_history(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<u64> {
        Game::find()
            .filter(game::Column::Time.lt(now))
            .filter(has_player(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Roster ====================

    /// Roster of a game in join order.
    pub async fn find_players(&self, game_id: &str) -> AppResult<Vec<game_player::Model>> {
        GamePlayer::find()
            .filter(game_player::Column::GameId.eq(game_id))
            .order_by_asc(game_player::Column::JoinedAt)
            .order_by_asc(game_player::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Rosters of several games in join order.
    pub async fn find_players_for_games(
        &self,
        game_ids: &[String],
    ) -> AppResult<Vec<game_player::Model>> {
        if game_ids.is_empty() {
            return Ok(vec![]);
        }

        GamePlayer::find()
            .filter(game_player::Column::GameId.is_in(game_ids.to_vec()))
            .order_by_asc(game_player::Column::JoinedAt)
            .order_by_asc(game_player::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the user holds a slot in the game.
    pub async fn is_player(&self, game_id: &str, user_id: &str) -> AppResult<bool> {
        let count = GamePlayer::find()
            .filter(game_player::Column::GameId.eq(game_id))
            .filter(game_player::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    // ==================== Invites ====================

    /// Whether the user is on the game's invite list.
    pub async fn is_invited(&self, game_id: &str, user_id: &str) -> AppResult<bool> {
        let count = GameInvite::find()
            .filter(game_invite::Column::GameId.eq(game_id))
            .filter(game_invite::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Add an invite. Returns false if the user was already invited.
    pub async fn add_invite(&self, model: game_invite::ActiveModel) -> AppResult<bool> {
        let inserted = GameInvite::insert(model)
            .on_conflict(
                OnConflict::columns([game_invite::Column::GameId, game_invite::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// IDs of users invited to the game.
    pub async fn find_invited_user_ids(&self, game_id: &str) -> AppResult<Vec<String>> {
        GameInvite::find()
            .filter(game_invite::Column::GameId.eq(game_id))
            .order_by_asc(game_invite::Column::CreatedAt)
            .select_only()
            .column(game_invite::Column::UserId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Chat ====================

    /// Append a chat message.
    pub async fn add_chat_message(
        &self,
        model: game_chat_message::ActiveModel,
    ) -> AppResult<game_chat_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Chat log oldest first, optionally only messages after `since`.
    pub async fn find_chat(
        &self,
        game_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<game_chat_message::Model>> {
        let mut query =
            GameChatMessage::find().filter(game_chat_message::Column::GameId.eq(game_id));

        if let Some(since) = since {
            query = query.filter(game_chat_message::Column::CreatedAt.gt(since));
        }

        query
            .order_by_asc(game_chat_message::Column::CreatedAt)
            .order_by_asc(game_chat_message::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

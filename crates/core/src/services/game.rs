//! Game service: the game registry and its membership rules.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use pickup_common::{AppError, AppResult, Config, IdGenerator};
use pickup_db::{
    entities::{
        game::{self, GameStatus, GameVisibility, SkillLevel, SportId},
        game_chat_message::{self, SYSTEM_USER_ID},
        game_invite, game_player, user,
    },
    repositories::{GameRepository, JoinOutcome, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

/// What is being played: one of the known sports, or a free-text name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sport {
    /// A sport from the fixed list.
    Known(SportId),
    /// A sport named by the host, stored under `other`.
    Custom(String),
}

impl Sport {
    /// Parse a sport id. `other` takes its name from `custom_name`.
    pub fn parse(id: &str, custom_name: Option<&str>) -> AppResult<Self> {
        match SportId::parse(id.trim()) {
            Some(SportId::Other) => {
                let name = custom_name.map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err(AppError::Validation(
                        "customSportName is required when sport is \"other\"".to_string(),
                    ));
                }
                Ok(Self::Custom(name.to_string()))
            }
            Some(known) => Ok(Self::Known(known)),
            None => Err(AppError::Validation(format!("Unknown sport: {id}"))),
        }
    }

    /// Split into stored columns.
    #[must_use]
    pub fn into_columns(self) -> (SportId, Option<String>) {
        match self {
            Self::Known(id) => (id, None),
            Self::Custom(name) => (SportId::Other, Some(name)),
        }
    }
}

/// Input for creating a game.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameInput {
    #[validate(required)]
    pub sport: Option<String>,

    #[validate(length(max = 64))]
    pub custom_sport_name: Option<String>,

    #[validate(required, length(min = 1, max = 256))]
    pub location: Option<String>,

    /// RFC 3339 timestamp.
    #[validate(required)]
    pub time: Option<String>,

    #[validate(required, range(min = 2, max = 30))]
    pub max_players: Option<i32>,

    #[serde(default)]
    pub skill_level: SkillLevel,

    #[serde(default)]
    #[validate(length(max = 200))]
    pub description: String,

    #[serde(default)]
    pub visibility: GameVisibility,
}

/// Host edits. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditGameInput {
    #[validate(length(min = 1, max = 256))]
    pub location: Option<String>,

    pub time: Option<String>,

    #[validate(range(min = 2, max = 30))]
    pub max_players: Option<i32>,

    pub skill_level: Option<SkillLevel>,

    #[validate(length(max = 200))]
    pub description: Option<String>,
}

/// Input for posting to a game's chat.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostChatInput {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

/// A roster entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub user_id: String,
    pub name: String,
    pub joined_at: DateTime<FixedOffset>,
}

impl From<game_player::Model> for PlayerResponse {
    fn from(p: game_player::Model) -> Self {
        Self {
            user_id: p.user_id,
            name: p.name,
            joined_at: p.joined_at,
        }
    }
}

/// A game with its roster.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub id: String,
    pub sport: SportId,
    pub custom_sport_name: Option<String>,
    pub location: String,
    pub time: DateTime<FixedOffset>,
    pub max_players: i32,
    pub spots_left: i32,
    pub players: Vec<PlayerResponse>,
    pub host_id: String,
    pub host_name: String,
    pub skill_level: SkillLevel,
    pub description: String,
    pub status: GameStatus,
    pub visibility: GameVisibility,
    /// Loaded on single-game reads of private games.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_users: Option<Vec<String>>,
    /// Shown to the host only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl GameResponse {
    fn build(
        g: game::Model,
        players: Vec<game_player::Model>,
        invited_users: Option<Vec<String>>,
        viewer_id: &str,
    ) -> Self {
        let visibility = g.effective_visibility();
        let spots_left = g.spots_left();
        let invite_code = if g.is_host(viewer_id) { g.invite_code } else { None };

        Self {
            id: g.id,
            sport: g.sport,
            custom_sport_name: g.custom_sport_name,
            location: g.location,
            time: g.time,
            max_players: g.max_players,
            spots_left,
            players: players.into_iter().map(Into::into).collect(),
            host_id: g.host_id,
            host_name: g.host_name,
            skill_level: g.skill_level,
            description: g.description,
            status: g.status,
            visibility,
            invited_users,
            invite_code,
            created_at: g.created_at,
        }
    }
}

/// A chat log entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub is_system: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<game_chat_message::Model> for ChatMessageResponse {
    fn from(m: game_chat_message::Model) -> Self {
        Self {
            is_system: m.is_system(),
            id: m.id,
            user_id: m.user_id,
            user_name: m.user_name,
            text: m.text,
            created_at: m.created_at,
        }
    }
}

/// Game service for business logic.
#[derive(Clone)]
pub struct GameService {
    game_repo: GameRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
    feed_limit: u64,
    history_limit: u64,
    system_sender_name: String,
}

impl GameService {
    /// Create a new game service.
    #[must_use]
    pub fn new(game_repo: GameRepository, user_repo: UserRepository, config: &Config) -> Self {
        Self {
            game_repo,
            user_repo,
            id_gen: IdGenerator::new(),
            feed_limit: config.games.feed_limit,
            history_limit: config.games.history_limit,
            system_sender_name: config.games.system_sender_name.clone(),
        }
    }

    // ==================== Queries ====================

    /// Upcoming public games. `sport` of `None` or `"all"` disables the filter.
    pub async fn list_public(&self, sport: Option<&str>, viewer_id: &str) -> AppResult<Vec<GameResponse>> {
        let sport = match sport.map(str::trim) {
            None | Some("" | "all") => None,
            Some(id) => Some(
                SportId::parse(id)
                    .ok_or_else(|| AppError::Validation(format!("Unknown sport: {id}")))?,
            ),
        };

        let games = self
            .game_repo
            .find_public_feed(sport, Utc::now(), self.feed_limit)
            .await?;
        self.with_rosters(games, viewer_id).await
    }

    /// Upcoming games the user plays in, including private ones.
    pub async fn list_mine(&self, user_id: &str) -> AppResult<Vec<GameResponse>> {
        let games = self
            .game_repo
            .find_upcoming_for_player(user_id, Utc::now())
            .await?;
        self.with_rosters(games, user_id).await
    }

    /// Upcoming games the user hosts.
    pub async fn list_hosted(&self, user_id: &str) -> AppResult<Vec<GameResponse>> {
        let games = self.game_repo.find_hosted_upcoming(user_id).await?;
        self.with_rosters(games, user_id).await
    }

    /// Past games the user played in, most recent first.
    pub async fn list_history(&self, user_id: &str) -> AppResult<Vec<GameResponse>> {
        let games = self
            .game_repo
            .find_history(user_id, Utc::now(), self.history_limit)
            .await?;
        self.with_rosters(games, user_id).await
    }

    /// A single game. Private games are only visible to the host, invited users and players.
    pub async fn get(&self, game_id: &str, viewer_id: &str) -> AppResult<GameResponse> {
        let game = self.game_repo.get_by_id(game_id).await?;
        let players = self.game_repo.find_players(game_id).await?;
        let invited = if game.is_private() {
            Some(self.game_repo.find_invited_user_ids(game_id).await?)
        } else {
            None
        };

        if game.is_private()
            && !game.is_host(viewer_id)
            && !players.iter().any(|p| p.user_id == viewer_id)
            && !invited.as_ref().is_some_and(|ids| ids.iter().any(|id| id == viewer_id))
        {
            debug!(game_id = %game_id, user_id = %viewer_id, "Private game read refused");
            return Err(AppError::Forbidden("This game is private".to_string()));
        }

        Ok(GameResponse::build(game, players, invited, viewer_id))
    }

    // ==================== Lifecycle ====================

    /// Create a game. The host takes the first roster slot.
    pub async fn create(&self, host: &user::Model, input: CreateGameInput) -> AppResult<GameResponse> {
        input.validate()?;

        let sport = Sport::parse(
            &required(input.sport, "sport")?,
            input.custom_sport_name.as_deref(),
        )?;
        let location = required(input.location, "location")?.trim().to_string();
        if location.is_empty() {
            return Err(AppError::Validation("location is required".to_string()));
        }
        let time = parse_future_time(&required(input.time, "time")?)?;
        let max_players = required(input.max_players, "maxPlayers")?;

        let now = Utc::now();
        let game_id = self.id_gen.generate();
        let invite_code = (input.visibility == GameVisibility::Private)
            .then(|| self.id_gen.generate_invite_code());
        let (sport, custom_sport_name) = sport.into_columns();

        let model = game::ActiveModel {
            id: Set(game_id.clone()),
            sport: Set(sport),
            custom_sport_name: Set(custom_sport_name),
            location: Set(location),
            time: Set(time),
            max_players: Set(max_players),
            players_count: Set(1),
            host_id: Set(host.id.clone()),
            host_name: Set(host.name.clone()),
            skill_level: Set(input.skill_level),
            description: Set(input.description.trim().to_string()),
            status: Set(GameStatus::Upcoming),
            visibility: Set(Some(input.visibility)),
            invite_code: Set(invite_code),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let host_slot = game_player::Model {
            id: self.id_gen.generate(),
            game_id: game_id.clone(),
            user_id: host.id.clone(),
            name: host.name.clone(),
            joined_at: now.into(),
        };

        let created = self
            .game_repo
            .create(model, player_active_model(&host_slot))
            .await?;

        info!(game_id = %created.id, host_id = %host.id, sport = created.sport.as_str(), "Game created");

        let invited = created.is_private().then(Vec::new);
        Ok(GameResponse::build(created, vec![host_slot], invited, &host.id))
    }

    /// Join a game.
    ///
    /// Capacity and duplicate checks are enforced by one transaction in the
    /// repository; on any failure nothing is written.
    pub async fn join(&self, game_id: &str, user: &user::Model) -> AppResult<GameResponse> {
        let game = self.game_repo.get_by_id(game_id).await?;

        if game.is_private()
            && !game.is_host(&user.id)
            && !self.game_repo.is_invited(game_id, &user.id).await?
        {
            debug!(game_id = %game_id, user_id = %user.id, "Uninvited join refused");
            return Err(AppError::Forbidden(
                "An invite is required to join this game".to_string(),
            ));
        }

        let now = Utc::now();
        let player = game_player::ActiveModel {
            id: Set(self.id_gen.generate()),
            game_id: Set(game_id.to_string()),
            user_id: Set(user.id.clone()),
            name: Set(user.name.clone()),
            joined_at: Set(now.into()),
        };
        let announcement = game_chat_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            game_id: Set(game_id.to_string()),
            user_id: Set(SYSTEM_USER_ID.to_string()),
            user_name: Set(self.system_sender_name.clone()),
            text: Set(format!("{} joined the game!", user.name)),
            created_at: Set(now.into()),
        };

        match self.game_repo.join(game_id, player, announcement).await? {
            JoinOutcome::Joined => {
                info!(game_id = %game_id, user_id = %user.id, "Player joined game");
            }
            JoinOutcome::Full => {
                debug!(game_id = %game_id, user_id = %user.id, "Join refused, game full");
                return Err(AppError::Capacity("This game is full".to_string()));
            }
            JoinOutcome::AlreadyJoined => {
                debug!(game_id = %game_id, user_id = %user.id, "Join refused, already a player");
                return Err(AppError::AlreadyJoined(
                    "You have already joined this game".to_string(),
                ));
            }
            JoinOutcome::GameMissing => {
                return Err(AppError::NotFound(format!("Game not found: {game_id}")));
            }
        }

        self.reload(game_id, &user.id).await
    }

    /// Leave a game. Leaving a game you are not in changes nothing.
    pub async fn leave(&self, game_id: &str, user_id: &str) -> AppResult<GameResponse> {
        let game = self.game_repo.get_by_id(game_id).await?;

        if game.is_host(user_id) {
            return Err(AppError::Forbidden(
                "The host cannot leave their own game; delete it instead".to_string(),
            ));
        }
        self.ensure_visible(&game, user_id).await?;

        if self.game_repo.leave(game_id, user_id).await? {
            info!(game_id = %game_id, user_id = %user_id, "Player left game");
        }

        self.reload(game_id, user_id).await
    }

    /// Apply host edits.
    pub async fn edit(
        &self,
        game_id: &str,
        caller_id: &str,
        input: EditGameInput,
    ) -> AppResult<GameResponse> {
        let game = self.game_repo.get_by_id(game_id).await?;
        ensure_host(&game, caller_id, "edit")?;
        input.validate()?;

        let mut changes = game::ActiveModel {
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };

        if let Some(location) = input.location {
            let location = location.trim().to_string();
            if location.is_empty() {
                return Err(AppError::Validation("location cannot be empty".to_string()));
            }
            changes.location = Set(location);
        }
        if let Some(time) = input.time {
            changes.time = Set(parse_future_time(&time)?);
        }
        if let Some(max_players) = input.max_players {
            if max_players < game.players_count {
                return Err(AppError::Validation(format!(
                    "maxPlayers cannot be below the current roster size ({})",
                    game.players_count
                )));
            }
            changes.max_players = Set(max_players);
        }
        if let Some(skill_level) = input.skill_level {
            changes.skill_level = Set(skill_level);
        }
        if let Some(description) = input.description {
            changes.description = Set(description.trim().to_string());
        }

        if !self
            .game_repo
            .update_details(game_id, changes, input.max_players)
            .await?
        {
            if self.game_repo.find_by_id(game_id).await?.is_none() {
                return Err(AppError::NotFound(format!("Game not found: {game_id}")));
            }
            warn!(game_id = %game_id, "Edit lost a race with a join");
            return Err(AppError::Conflict(
                "The roster changed; it no longer fits the new maxPlayers".to_string(),
            ));
        }

        info!(game_id = %game_id, host_id = %caller_id, "Game edited");
        self.reload(game_id, caller_id).await
    }

    /// Delete a game permanently.
    pub async fn delete(&self, game_id: &str, caller_id: &str) -> AppResult<()> {
        let game = self.game_repo.get_by_id(game_id).await?;
        ensure_host(&game, caller_id, "delete")?;

        if !self.game_repo.delete(game_id).await? {
            return Err(AppError::NotFound(format!("Game not found: {game_id}")));
        }

        info!(game_id = %game_id, host_id = %caller_id, "Game deleted");
        Ok(())
    }

    /// Put a user on the invite list. Re-inviting is a no-op.
    pub async fn invite(
        &self,
        game_id: &str,
        caller_id: &str,
        invitee_id: &str,
    ) -> AppResult<GameResponse> {
        let game = self.game_repo.get_by_id(game_id).await?;
        ensure_host(&game, caller_id, "invite to")?;
        self.user_repo.get_by_id(invitee_id).await?;

        let model = game_invite::ActiveModel {
            id: Set(self.id_gen.generate()),
            game_id: Set(game_id.to_string()),
            user_id: Set(invitee_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        if self.game_repo.add_invite(model).await? {
            info!(game_id = %game_id, user_id = %invitee_id, "User invited to game");
        }

        self.reload(game_id, caller_id).await
    }

    // ==================== Chat ====================

    /// Post to the game chat. Only players may post.
    pub async fn post_chat(
        &self,
        game_id: &str,
        user: &user::Model,
        input: PostChatInput,
    ) -> AppResult<Vec<ChatMessageResponse>> {
        input.validate()?;
        let text = input.text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message text is required".to_string()));
        }

        self.game_repo.get_by_id(game_id).await?;
        if !self.game_repo.is_player(game_id, &user.id).await? {
            return Err(AppError::Forbidden(
                "Only players can post in the game chat".to_string(),
            ));
        }

        let model = game_chat_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            game_id: Set(game_id.to_string()),
            user_id: Set(user.id.clone()),
            user_name: Set(user.name.clone()),
            text: Set(text.to_string()),
            created_at: Set(Utc::now().into()),
        };
        self.game_repo.add_chat_message(model).await?;

        self.chat_log(game_id, None).await
    }

    /// Read the game chat, optionally only messages after `since`.
    pub async fn get_chat(
        &self,
        game_id: &str,
        viewer_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<ChatMessageResponse>> {
        let game = self.game_repo.get_by_id(game_id).await?;

        self.ensure_visible(&game, viewer_id).await?;

        self.chat_log(game_id, since).await
    }

    // ==================== Helpers ====================

    /// Refuse callers who are neither host, player nor invitee of a private game.
    async fn ensure_visible(&self, game: &game::Model, user_id: &str) -> AppResult<()> {
        if game.is_private()
            && !game.is_host(user_id)
            && !self.game_repo.is_player(&game.id, user_id).await?
            && !self.game_repo.is_invited(&game.id, user_id).await?
        {
            debug!(game_id = %game.id, user_id = %user_id, "Private game access refused");
            return Err(AppError::Forbidden("This game is private".to_string()));
        }
        Ok(())
    }

    async fn chat_log(
        &self,
        game_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<ChatMessageResponse>> {
        let messages = self.game_repo.find_chat(game_id, since).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    /// Re-read a game after a write.
    async fn reload(&self, game_id: &str, viewer_id: &str) -> AppResult<GameResponse> {
        let game = self.game_repo.get_by_id(game_id).await?;
        let players = self.game_repo.find_players(game_id).await?;
        let invited = if game.is_private() {
            Some(self.game_repo.find_invited_user_ids(game_id).await?)
        } else {
            None
        };
        Ok(GameResponse::build(game, players, invited, viewer_id))
    }

    async fn with_rosters(
        &self,
        games: Vec<game::Model>,
        viewer_id: &str,
    ) -> AppResult<Vec<GameResponse>> {
        let ids: Vec<String> = games.iter().map(|g| g.id.clone()).collect();
        let mut rosters: HashMap<String, Vec<game_player::Model>> = HashMap::new();
        for player in self.game_repo.find_players_for_games(&ids).await? {
            rosters.entry(player.game_id.clone()).or_default().push(player);
        }

        Ok(games
            .into_iter()
            .map(|g| {
                let players = rosters.remove(&g.id).unwrap_or_default();
                GameResponse::build(g, players, None, viewer_id)
            })
            .collect())
    }
}

fn ensure_host(game: &game::Model, caller_id: &str, action: &str) -> AppResult<()> {
    if game.is_host(caller_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the host can {action} this game"
        )))
    }
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

/// Parse an RFC 3339 time that must lie strictly in the future.
fn parse_future_time(raw: &str) -> AppResult<DateTime<FixedOffset>> {
    let time = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid time: {raw}")))?;

    if time <= Utc::now() {
        return Err(AppError::InvalidTime(
            "Game time must be in the future".to_string(),
        ));
    }

    Ok(time)
}

fn player_active_model(p: &game_player::Model) -> game_player::ActiveModel {
    game_player::ActiveModel {
        id: Set(p.id.clone()),
        game_id: Set(p.game_id.clone()),
        user_id: Set(p.user_id.clone()),
        name: Set(p.name.clone()),
        joined_at: Set(p.joined_at),
    }
}

//! Game entity - a scheduled pickup game with a fixed capacity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sport identifier as stored. `Other` carries its name in `custom_sport_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "kebab-case")]
pub enum SportId {
    #[sea_orm(string_value = "table-tennis")]
    TableTennis,
    #[sea_orm(string_value = "basketball")]
    Basketball,
    #[sea_orm(string_value = "soccer")]
    Soccer,
    #[sea_orm(string_value = "volleyball")]
    Volleyball,
    #[sea_orm(string_value = "badminton")]
    Badminton,
    #[sea_orm(string_value = "tennis")]
    Tennis,
    #[sea_orm(string_value = "frisbee")]
    Frisbee,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "other")]
    Other,
}

impl SportId {
    /// The known sports, excluding `Other`.
    pub const KNOWN: [Self; 8] = [
        Self::TableTennis,
        Self::Basketball,
        Self::Soccer,
        Self::Volleyball,
        Self::Badminton,
        Self::Tennis,
        Self::Frisbee,
        Self::Running,
    ];

    /// Wire identifier, e.g. `table-tennis`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TableTennis => "table-tennis",
            Self::Basketball => "basketball",
            Self::Soccer => "soccer",
            Self::Volleyball => "volleyball",
            Self::Badminton => "badminton",
            Self::Tennis => "tennis",
            Self::Frisbee => "frisbee",
            Self::Running => "running",
            Self::Other => "other",
        }
    }

    /// Parse a wire identifier.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        Self::KNOWN
            .into_iter()
            .chain(std::iter::once(Self::Other))
            .find(|s| s.as_str() == id)
    }
}

/// Skill level requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum SkillLevel {
    #[sea_orm(string_value = "any")]
    #[default]
    Any,
    #[sea_orm(string_value = "beginner")]
    Beginner,
    #[sea_orm(string_value = "intermediate")]
    Intermediate,
    #[sea_orm(string_value = "advanced")]
    Advanced,
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum GameStatus {
    #[sea_orm(string_value = "upcoming")]
    #[default]
    Upcoming,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Who can see and join a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum GameVisibility {
    /// Listed in the public feed.
    #[sea_orm(string_value = "public")]
    #[default]
    Public,
    /// Only the host, invited users and players.
    #[sea_orm(string_value = "private")]
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub sport: SportId,

    /// Set only when `sport` is `Other`.
    #[sea_orm(nullable)]
    pub custom_sport_name: Option<String>,

    pub location: String,

    #[sea_orm(indexed)]
    pub time: DateTimeWithTimeZone,

    pub max_players: i32,

    /// Roster length. Only changed in the transaction that adds or removes a player.
    #[sea_orm(default_value = 0)]
    pub players_count: i32,

    #[sea_orm(indexed)]
    pub host_id: String,

    /// Host name at creation time (not re-synced on rename).
    pub host_name: String,

    pub skill_level: SkillLevel,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(indexed)]
    pub status: GameStatus,

    /// NULL for legacy records, which are treated as public.
    #[sea_orm(nullable)]
    pub visibility: Option<GameVisibility>,

    /// Generated for private games only.
    #[sea_orm(nullable)]
    pub invite_code: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Effective visibility; legacy records without one are public.
    #[must_use]
    pub fn effective_visibility(&self) -> GameVisibility {
        self.visibility.unwrap_or_default()
    }

    /// Whether this game is private.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.effective_visibility() == GameVisibility::Private
    }

    /// Whether `user_id` hosts this game.
    #[must_use]
    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// Open slots left.
    #[must_use]
    pub const fn spots_left(&self) -> i32 {
        let left = self.max_players - self.players_count;
        if left < 0 { 0 } else { left }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::HostId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Host,
    #[sea_orm(has_many = "super::game_player::Entity")]
    Players,
    #[sea_orm(has_many = "super::game_invite::Entity")]
    Invites,
    #[sea_orm(has_many = "super::game_chat_message::Entity")]
    ChatMessages,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl Related<super::game_player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Players.def()
    }
}

impl Related<super::game_invite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invites.def()
    }
}

impl Related<super::game_chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChatMessages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_id_parse_round_trips_known_ids() {
        for sport in SportId::KNOWN {
            assert_eq!(SportId::parse(sport.as_str()), Some(sport));
        }
        assert_eq!(SportId::parse("other"), Some(SportId::Other));
        assert_eq!(SportId::parse("quidditch"), None);
    }

    #[test]
    fn test_sport_id_serializes_kebab_case() {
        let json = serde_json::to_string(&SportId::TableTennis).unwrap_or_default();
        assert_eq!(json, "\"table-tennis\"");
    }
}

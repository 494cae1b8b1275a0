//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name
    pub name: String,

    /// Lowercased name for case-insensitive search
    pub name_lower: String,

    /// Lowercased email address
    #[sea_orm(unique)]
    pub email: String,

    /// Set at registration for `.edu` addresses
    #[sea_orm(default_value = false)]
    pub is_verified_student: bool,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub password_hash: Option<String>,

    /// Access token
    #[serde(skip_serializing)]
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    /// Ordered sport identifiers; the first one is the top sport
    #[sea_orm(column_type = "JsonBinary")]
    pub favorite_sports: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Favorite sports as a list of identifiers.
    #[must_use]
    pub fn favorite_sport_ids(&self) -> Vec<String> {
        serde_json::from_value(self.favorite_sports.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::game::Entity")]
    HostedGames,
    #[sea_orm(has_many = "super::game_player::Entity")]
    Memberships,
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HostedGames.def()
    }
}

impl Related<super::game_player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

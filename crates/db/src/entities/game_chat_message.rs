//! Game chat message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Author id used for synthetic announcements.
pub const SYSTEM_USER_ID: &str = "system";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_chat_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub game_id: String,

    /// Author id, or `system` for join announcements. Not a foreign key.
    pub user_id: String,

    /// Author name when the message was posted
    pub user_name: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.user_id == SYSTEM_USER_ID
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::game::Entity",
        from = "Column::GameId",
        to = "super::game::Column::Id",
        on_delete = "Cascade"
    )]
    Game,
}

impl Related<super::game::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Game.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

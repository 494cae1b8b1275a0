//! Friend entity (friend requests and accepted friendships).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a friend record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum FriendStatus {
    /// Request sent, waiting for the recipient.
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Recipient accepted; the pair are friends.
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Kept for schema compatibility. Rejection deletes the record instead.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Friend record. Unique per unordered pair through `pair_key`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friend")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who sent the request
    #[sea_orm(indexed)]
    pub from_id: String,

    /// The user who received the request
    #[sea_orm(indexed)]
    pub to_id: String,

    /// Both ids sorted and joined with ':'
    #[sea_orm(unique)]
    pub pair_key: String,

    pub status: FriendStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// The participant that is not `user_id`.
    #[must_use]
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.from_id == user_id {
            &self.to_id
        } else {
            &self.from_id
        }
    }

    /// Whether `user_id` is one of the two participants.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.from_id == user_id || self.to_id == user_id
    }
}

/// Key identifying the unordered pair `{a, b}`.
#[must_use]
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FromId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Sender,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ToId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl ActiveModelBehavior for ActiveModel {}

//! Direct message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "direct_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Sender user ID
    #[sea_orm(indexed)]
    pub from_id: String,

    /// Recipient user ID
    #[sea_orm(indexed)]
    pub to_id: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub created_at: DateTimeWithTimeZone,
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

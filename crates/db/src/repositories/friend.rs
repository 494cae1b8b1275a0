//! Friend repository.

use std::sync::Arc;

use chrono::Utc;
use pickup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, sea_query::Expr,
};

use crate::entities::friend::{self, FriendStatus, pair_key};
use crate::entities::Friend;
use crate::is_unique_violation;

/// Repository for friend requests and friendships.
#[derive(Clone)]
pub struct FriendRepository {
    db: Arc<DatabaseConnection>,
}

impl FriendRepository {
    /// Create a new friend repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a friend record by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<friend::Model>> {
        Friend::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the record connecting two users, in either direction.
    pub async fn find_by_pair(&self, a: &str, b: &str) -> AppResult<Option<friend::Model>> {
        Friend::find()
            .filter(friend::Column::PairKey.eq(pair_key(a, b)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether two users have an accepted friendship.
    pub async fn are_friends(&self, a: &str, b: &str) -> AppResult<bool> {
        Ok(self
            .find_by_pair(a, b)
            .await?
            .is_some_and(|f| f.status == FriendStatus::Accepted))
    }

    /// Insert a new request. A concurrent insert for the same pair yields `AlreadyExists`.
    pub async fn create(&self, model: friend::ActiveModel) -> AppResult<friend::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists("A friend request already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Move a pending request to accepted. Returns false if it was no longer pending.
    pub async fn accept(&self, id: &str) -> AppResult<bool> {
        let result = Friend::update_many()
            .col_expr(friend::Column::Status, Expr::value(FriendStatus::Accepted))
            .col_expr(
                friend::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(friend::Column::Id.eq(id))
            .filter(friend::Column::Status.eq(FriendStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete a record. Returns false if it was already gone.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Friend::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete a request only while it is still pending. Returns false if it was
    /// accepted or removed in the meantime.
    pub async fn delete_pending(&self, id: &str) -> AppResult<bool> {
        let result = Friend::delete_many()
            .filter(friend::Column::Id.eq(id))
            .filter(friend::Column::Status.eq(FriendStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Accepted friendships the user takes part in.
    pub async fn find_accepted_for_user(&self, user_id: &str) -> AppResult<Vec<friend::Model>> {
        Friend::find()
            .filter(friend::Column::Status.eq(FriendStatus::Accepted))
            .filter(
                Condition::any()
                    .add(friend::Column::FromId.eq(user_id))
                    .add(friend::Column::ToId.eq(user_id)),
            )
            .order_by_desc(friend::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending requests addressed to the user, oldest first.
    pub async fn find_pending_for_recipient(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<friend::Model>> {
        Friend::find()
            .filter(friend::Column::ToId.eq(user_id))
            .filter(friend::Column::Status.eq(FriendStatus::Pending))
            .order_by_asc(friend::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

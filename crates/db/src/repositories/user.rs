//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use crate::is_unique_violation;
use pickup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {id}")))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by (already lowercased) email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user. A taken email yields `AlreadyExists`.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists("Email is already registered".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-insensitive substring search on display name.
    pub async fn search(
        &self,
        query: &str,
        exclude_id: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        let query_lower = query.to_lowercase();
        let pattern = format!(
            "%{}%",
            query_lower.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );

        User::find()
            .filter(
                Condition::all()
                    .add(user::Column::NameLower.like(pattern))
                    .add(user::Column::Id.ne(exclude_id)),
            )
            .order_by_asc(user::Column::NameLower)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

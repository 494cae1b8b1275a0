//! Direct message repository.

use crate::entities::direct_message::{self, ActiveModel, Column, Entity as DirectMessage};
use pickup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Statement, Value,
};
use std::sync::Arc;

/// Repository for direct message operations.
#[derive(Clone)]
pub struct MessagingRepository {
    db: Arc<DatabaseConnection>,
}

/// Messages exchanged between `a` and `b`, in either direction.
fn between(a: &str, b: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(Column::FromId.eq(a))
                .add(Column::ToId.eq(b)),
        )
        .add(
            Condition::all()
                .add(Column::FromId.eq(b))
                .add(Column::ToId.eq(a)),
        )
}

impl MessagingRepository {
    /// Create a new messaging repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a message.
    pub async fn create(&self, model: ActiveModel) -> AppResult<direct_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every message between two users, oldest first.
    pub async fn find_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<Vec<direct_message::Model>> {
        DirectMessage::find()
            .filter(between(user_id, partner_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The latest message exchanged with each of `partner_ids`, in one query.
    /// Partners with no messages are absent from the result.
    pub async fn find_latest_per_partner(
        &self,
        user_id: &str,
        partner_ids: &[String],
    ) -> AppResult<Vec<direct_message::Model>> {
        if partner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (2..=partner_ids.len() + 1)
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r"
            SELECT DISTINCT ON (partner_id) id, from_id, to_id, text, created_at
            FROM (
                SELECT *, CASE WHEN from_id = $1 THEN to_id ELSE from_id END AS partner_id
                FROM direct_message
                WHERE from_id = $1 OR to_id = $1
            ) AS conversation
            WHERE partner_id IN ({placeholders})
            ORDER BY partner_id, created_at DESC, id DESC
            "
        );

        let mut values: Vec<Value> = Vec::with_capacity(partner_ids.len() + 1);
        values.push(user_id.into());
        values.extend(partner_ids.iter().map(|id| id.as_str().into()));

        DirectMessage::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                values,
            ))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

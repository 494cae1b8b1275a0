//! Friend graph service.
//!
//! A pair of users has at most one friend record. It is created `pending` by
//! a request, becomes `accepted` when the recipient accepts, and is deleted on
//! reject or unfriend, which returns the pair to "no relation".

use chrono::Utc;
use pickup_common::{AppError, AppResult, IdGenerator};
use pickup_db::{
    entities::friend::{self, FriendStatus, pair_key},
    repositories::{FriendRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::user::UserResponse;

/// Friend service for business logic.
#[derive(Clone)]
pub struct FriendService {
    friend_repo: FriendRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for sending a friend request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequestInput {
    pub to_id: String,
}

/// Recipient's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendDecision {
    /// Turn the request into a friendship.
    Accept,
    /// Drop the request, so either side may ask again.
    Reject,
}

/// A friend request record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestResponse {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub status: FriendStatus,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl FriendRequestResponse {
    fn from_model(f: friend::Model, status: FriendStatus) -> Self {
        Self {
            id: f.id,
            from_id: f.from_id,
            to_id: f.to_id,
            status,
            created_at: f.created_at,
        }
    }
}

/// A pending request addressed to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequestResponse {
    pub id: String,
    pub from: UserResponse,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

/// A friend, with the record that links them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendResponse {
    pub friendship_id: String,
    pub user: UserResponse,
    pub since: chrono::DateTime<chrono::FixedOffset>,
}

impl FriendService {
    /// Create a new friend service.
    #[must_use]
    pub const fn new(friend_repo: FriendRepository, user_repo: UserRepository) -> Self {
        Self {
            friend_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Send a friend request from `from_id` to `to_id`.
    pub async fn send_request(&self, from_id: &str, to_id: &str) -> AppResult<FriendRequestResponse> {
        if from_id == to_id {
            return Err(AppError::Validation(
                "Cannot send a friend request to yourself".to_string(),
            ));
        }

        self.user_repo.get_by_id(to_id).await?;

        if let Some(existing) = self.friend_repo.find_by_pair(from_id, to_id).await? {
            debug!(from_id = %from_id, to_id = %to_id, "Duplicate friend request");
            let reason = if existing.status == FriendStatus::Accepted {
                "Already friends"
            } else {
                "A friend request is already pending"
            };
            return Err(AppError::AlreadyExists(reason.to_string()));
        }

        let model = friend::ActiveModel {
            id: Set(self.id_gen.generate()),
            from_id: Set(from_id.to_string()),
            to_id: Set(to_id.to_string()),
            pair_key: Set(pair_key(from_id, to_id)),
            status: Set(FriendStatus::Pending),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.friend_repo.create(model).await?;
        info!(request_id = %created.id, from_id = %from_id, to_id = %to_id, "Friend request sent");

        Ok(FriendRequestResponse::from_model(created, FriendStatus::Pending))
    }

    /// Accept or reject a pending request. Only its recipient may answer.
    pub async fn respond(
        &self,
        request_id: &str,
        caller_id: &str,
        decision: FriendDecision,
    ) -> AppResult<FriendRequestResponse> {
        let request = self
            .friend_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Friend request not found: {request_id}")))?;

        if request.to_id != caller_id {
            return Err(AppError::Forbidden(
                "Only the recipient can respond to a friend request".to_string(),
            ));
        }

        if request.status != FriendStatus::Pending {
            return Err(AppError::Conflict(
                "Friend request is no longer pending".to_string(),
            ));
        }

        match decision {
            FriendDecision::Accept => {
                if !self.friend_repo.accept(request_id).await? {
                    warn!(request_id = %request_id, "Friend request changed before accept");
                    return Err(AppError::Conflict(
                        "Friend request is no longer pending".to_string(),
                    ));
                }
                info!(request_id = %request_id, "Friend request accepted");
                Ok(FriendRequestResponse::from_model(request, FriendStatus::Accepted))
            }
            FriendDecision::Reject => {
                if !self.friend_repo.delete_pending(request_id).await? {
                    warn!(request_id = %request_id, "Friend request changed before reject");
                    return Err(AppError::Conflict(
                        "Friend request is no longer pending".to_string(),
                    ));
                }
                info!(request_id = %request_id, "Friend request rejected");
                Ok(FriendRequestResponse::from_model(request, FriendStatus::Rejected))
            }
        }
    }

    /// Pending requests addressed to the user.
    pub async fn list_requests(&self, user_id: &str) -> AppResult<Vec<IncomingRequestResponse>> {
        let pending = self.friend_repo.find_pending_for_recipient(user_id).await?;
        let sender_ids: Vec<String> = pending.iter().map(|f| f.from_id.clone()).collect();
        let senders = self.user_repo.find_by_ids(&sender_ids).await?;

        Ok(pending
            .into_iter()
            .filter_map(|f| {
                let sender = senders.iter().find(|u| u.id == f.from_id)?;
                Some(IncomingRequestResponse {
                    id: f.id,
                    from: UserResponse::from(sender),
                    created_at: f.created_at,
                })
            })
            .collect())
    }

    /// Everyone the user has an accepted friendship with.
    pub async fn list_friends(&self, user_id: &str) -> AppResult<Vec<FriendResponse>> {
        let records = self.friend_repo.find_accepted_for_user(user_id).await?;
        let friend_ids: Vec<String> = records
            .iter()
            .map(|f| f.other_party(user_id).to_string())
            .collect();
        let users = self.user_repo.find_by_ids(&friend_ids).await?;

        Ok(records
            .into_iter()
            .filter_map(|f| {
                let other = users.iter().find(|u| u.id == f.other_party(user_id))?;
                Some(FriendResponse {
                    user: UserResponse::from(other),
                    since: f.updated_at.unwrap_or(f.created_at),
                    friendship_id: f.id,
                })
            })
            .collect())
    }

    /// End a friendship. Either participant may do so.
    pub async fn remove_friend(&self, friendship_id: &str, caller_id: &str) -> AppResult<()> {
        let record = self
            .friend_repo
            .find_by_id(friendship_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Friendship not found: {friendship_id}")))?;

        if !record.involves(caller_id) {
            return Err(AppError::Forbidden(
                "Not a participant in this friendship".to_string(),
            ));
        }

        if record.status != FriendStatus::Accepted {
            return Err(AppError::Validation("Not friends".to_string()));
        }

        self.friend_repo.delete(friendship_id).await?;
        info!(friendship_id = %friendship_id, user_id = %caller_id, "Friend removed");

        Ok(())
    }

    /// Whether two users are friends.
    pub async fn are_friends(&self, a: &str, b: &str) -> AppResult<bool> {
        self.friend_repo.are_friends(a, b).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pickup_db::entities::user;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: id.to_string(),
            name_lower: id.to_lowercase(),
            email: format!("{id}@campus.edu"),
            is_verified_student: true,
            password_hash: None,
            token: None,
            favorite_sports: serde_json::json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_friend(id: &str, from: &str, to: &str, status: FriendStatus) -> friend::Model {
        friend::Model {
            id: id.to_string(),
            from_id: from.to_string(),
            to_id: to.to_string(),
            pair_key: pair_key(from, to),
            status,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> FriendService {
        let conn = Arc::new(db.into_connection());
        FriendService::new(
            FriendRepository::new(Arc::clone(&conn)),
            UserRepository::new(conn),
        )
    }

    const fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_send_request_to_self() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.send_request("alice", "alice").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_request_reverse_pending_exists() {
        // bob -> alice already pending; alice -> bob must be refused
        let existing = create_test_friend("f1", "bob", "alice", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("bob")]])
                .append_query_results([[existing]]),
        );

        let result = svc.send_request("alice", "bob").await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_send_request_unknown_target() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = svc.send_request("alice", "ghost").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_request_creates_pending() {
        let created = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("bob")]])
                .append_query_results([Vec::<friend::Model>::new()])
                .append_query_results([[created]]),
        );

        let request = svc.send_request("alice", "bob").await.unwrap();
        assert_eq!(request.status, FriendStatus::Pending);
        assert_eq!(request.to_id, "bob");
    }

    #[tokio::test]
    async fn test_respond_by_sender_is_forbidden() {
        let request = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[request]]));

        let result = svc.respond("f1", "alice", FriendDecision::Accept).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_accept_race_is_conflict() {
        let request = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .append_exec_results([exec(0)]),
        );

        let result = svc.respond("f1", "bob", FriendDecision::Accept).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_accept() {
        let request = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .append_exec_results([exec(1)]),
        );

        let response = svc.respond("f1", "bob", FriendDecision::Accept).await.unwrap();
        assert_eq!(response.status, FriendStatus::Accepted);
    }

    #[tokio::test]
    async fn test_reject_deletes_record() {
        let request = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .append_exec_results([exec(1)]),
        );

        let response = svc.respond("f1", "bob", FriendDecision::Reject).await.unwrap();
        assert_eq!(response.status, FriendStatus::Rejected);
    }

    #[tokio::test]
    async fn test_reject_after_accept_is_conflict() {
        let request = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .append_exec_results([exec(0)]),
        );

        let result = svc.respond("f1", "bob", FriendDecision::Reject).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_friends_both_directions() {
        let f1 = create_test_friend("f1", "alice", "bob", FriendStatus::Accepted);
        let f2 = create_test_friend("f2", "carol", "alice", FriendStatus::Accepted);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .append_query_results([[create_test_user("bob"), create_test_user("carol")]]),
        );

        let friends = svc.list_friends("alice").await.unwrap();
        let ids: Vec<&str> = friends.iter().map(|f| f.user.id.as_str()).collect();

        assert_eq!(ids, vec!["bob", "carol"]);
        assert_eq!(friends[1].friendship_id, "f2");
    }

    #[tokio::test]
    async fn test_list_requests_includes_sender() {
        let pending = create_test_friend("f1", "bob", "alice", FriendStatus::Pending);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .append_query_results([[create_test_user("bob")]]),
        );

        let requests = svc.list_requests("alice").await.unwrap();

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "f1");
        assert_eq!(requests[0].from.id, "bob");
    }

    #[tokio::test]
    async fn test_remove_friend_by_outsider() {
        let record = create_test_friend("f1", "alice", "bob", FriendStatus::Accepted);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[record]]));

        let result = svc.remove_friend("f1", "mallory").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_remove_pending_is_not_friends() {
        let record = create_test_friend("f1", "alice", "bob", FriendStatus::Pending);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[record]]));

        let result = svc.remove_friend("f1", "alice").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_friend() {
        let record = create_test_friend("f1", "alice", "bob", FriendStatus::Accepted);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record]])
                .append_exec_results([exec(1)]),
        );

        assert!(svc.remove_friend("f1", "bob").await.is_ok());
    }
}

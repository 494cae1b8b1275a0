//! Messaging service.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use pickup_common::{AppError, AppResult, IdGenerator};
use pickup_db::{
    entities::direct_message,
    repositories::{FriendRepository, MessagingRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::user::UserResponse;

/// Messaging service for business logic.
#[derive(Clone)]
pub struct MessagingService {
    messaging_repo: MessagingRepository,
    friend_repo: FriendRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
    require_friendship: bool,
}

/// Input for sending a direct message.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

/// A direct message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub text: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<direct_message::Model> for MessageResponse {
    fn from(m: direct_message::Model) -> Self {
        Self {
            id: m.id,
            from_id: m.from_id,
            to_id: m.to_id,
            text: m.text,
            created_at: m.created_at,
        }
    }
}

/// One entry of the chat list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryResponse {
    pub friendship_id: String,
    pub friend: UserResponse,
    pub last_message: Option<String>,
    pub last_message_from_id: Option<String>,
    /// Time of the last message, or of the friendship if none were sent.
    pub last_activity_at: DateTime<FixedOffset>,
}

impl MessagingService {
    /// Create a new messaging service.
    #[must_use]
    pub const fn new(
        messaging_repo: MessagingRepository,
        friend_repo: FriendRepository,
        user_repo: UserRepository,
        require_friendship: bool,
    ) -> Self {
        Self {
            messaging_repo,
            friend_repo,
            user_repo,
            id_gen: IdGenerator::new(),
            require_friendship,
        }
    }

    /// Send a message.
    pub async fn send(
        &self,
        from_id: &str,
        to_id: &str,
        input: SendMessageInput,
    ) -> AppResult<MessageResponse> {
        input.validate()?;

        if from_id == to_id {
            return Err(AppError::Validation(
                "Cannot send a message to yourself".to_string(),
            ));
        }
        if input.text.trim().is_empty() {
            return Err(AppError::Validation("Message text is required".to_string()));
        }

        self.user_repo.get_by_id(to_id).await?;

        if self.require_friendship && !self.friend_repo.are_friends(from_id, to_id).await? {
            debug!(from_id = %from_id, to_id = %to_id, "Message to non-friend refused");
            return Err(AppError::Forbidden(
                "You can only message your friends".to_string(),
            ));
        }

        let model = direct_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            from_id: Set(from_id.to_string()),
            to_id: Set(to_id.to_string()),
            text: Set(input.text),
            created_at: Set(Utc::now().into()),
        };

        let message = self.messaging_repo.create(model).await?;
        info!(message_id = %message.id, from_id = %from_id, to_id = %to_id, "Message sent");

        Ok(message.into())
    }

    /// The conversation between two users, oldest first.
    pub async fn conversation(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<Vec<MessageResponse>> {
        let messages = self
            .messaging_repo
            .find_conversation(user_id, partner_id)
            .await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    /// One entry per friend, most recent activity first.
    pub async fn chats_summary(&self, user_id: &str) -> AppResult<Vec<ChatSummaryResponse>> {
        let friendships = self.friend_repo.find_accepted_for_user(user_id).await?;
        let friend_ids: Vec<String> = friendships
            .iter()
            .map(|f| f.other_party(user_id).to_string())
            .collect();
        let users = self.user_repo.find_by_ids(&friend_ids).await?;
        let mut latest: HashMap<String, direct_message::Model> = self
            .messaging_repo
            .find_latest_per_partner(user_id, &friend_ids)
            .await?
            .into_iter()
            .map(|m| {
                let partner = if m.from_id == user_id {
                    m.to_id.clone()
                } else {
                    m.from_id.clone()
                };
                (partner, m)
            })
            .collect();

        let mut summaries = Vec::with_capacity(friendships.len());
        for friendship in friendships {
            let partner_id = friendship.other_party(user_id);
            let Some(partner) = users.iter().find(|u| u.id == partner_id) else {
                continue;
            };

            let (last_message, last_message_from_id, last_activity_at) =
                match latest.remove(partner_id) {
                    Some(m) => (Some(m.text), Some(m.from_id), m.created_at),
                    None => (None, None, friendship.created_at),
                };

            summaries.push(ChatSummaryResponse {
                friendship_id: friendship.id.clone(),
                friend: UserResponse::from(partner),
                last_message,
                last_message_from_id,
                last_activity_at,
            });
        }

        summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(summaries)
    }
}

//! Friends, direct messages and user search.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use pickup_common::AppResult;
use pickup_core::{
    ChatSummaryResponse, FriendDecision, FriendRequestResponse, FriendResponse,
    IncomingRequestResponse, MessageResponse, SendFriendRequestInput, SendMessageInput,
    UserResponse,
};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Confirmation},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/friend-requests", get(list_requests).post(send_request))
        .route("/friend-requests/{id}/accept", post(accept_request))
        .route("/friend-requests/{id}/reject", post(reject_request))
        .route("/friends", get(list_friends))
        .route("/friends/{id}", delete(remove_friend))
        .route("/messages/{user_id}", get(conversation).post(send_message))
        .route("/chats", get(chats))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

async fn search(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state.user_service.search_users(&query.q, &user.id).await?;
    Ok(ApiResponse::ok(users))
}

// ==================== Friends ====================

async fn send_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendFriendRequestInput>,
) -> AppResult<ApiResponse<FriendRequestResponse>> {
    let request = state
        .friend_service
        .send_request(&user.id, &input.to_id)
        .await?;
    Ok(ApiResponse::created(request))
}

async fn list_requests(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<IncomingRequestResponse>>> {
    Ok(ApiResponse::ok(state.friend_service.list_requests(&user.id).await?))
}

async fn accept_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FriendRequestResponse>> {
    let request = state
        .friend_service
        .respond(&id, &user.id, FriendDecision::Accept)
        .await?;
    Ok(ApiResponse::ok(request))
}

async fn reject_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FriendRequestResponse>> {
    let request = state
        .friend_service
        .respond(&id, &user.id, FriendDecision::Reject)
        .await?;
    Ok(ApiResponse::ok(request))
}

async fn list_friends(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<FriendResponse>>> {
    Ok(ApiResponse::ok(state.friend_service.list_friends(&user.id).await?))
}

async fn remove_friend(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Confirmation>> {
    state.friend_service.remove_friend(&id, &user.id).await?;
    Ok(Confirmation::done())
}

// ==================== Messages ====================

async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<SendMessageInput>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .messaging_service
        .send(&user.id, &user_id, input)
        .await?;
    Ok(ApiResponse::created(message))
}

async fn conversation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let messages = state
        .messaging_service
        .conversation(&user.id, &user_id)
        .await?;
    Ok(ApiResponse::ok(messages))
}

async fn chats(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ChatSummaryResponse>>> {
    Ok(ApiResponse::ok(state.messaging_service.chats_summary(&user.id).await?))
}

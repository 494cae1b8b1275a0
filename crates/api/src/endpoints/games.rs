//! Game endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use pickup_common::AppResult;
use pickup_core::{
    ChatMessageResponse, CreateGameInput, EditGameInput, GameResponse, PostChatInput,
};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Confirmation},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_public).post(create))
        .route("/mine", get(list_mine))
        .route("/hosted", get(list_hosted))
        .route("/history", get(list_history))
        .route("/{id}", get(show).patch(edit).delete(remove))
        .route("/{id}/join", post(join))
        .route("/{id}/leave", post(leave))
        .route("/{id}/invite", post(invite))
        .route("/{id}/chat", get(chat).post(post_chat))
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Sport id, or `all`.
    pub sport: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub user_id: String,
}

async fn list_public(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Vec<GameResponse>>> {
    let games = state
        .game_service
        .list_public(query.sport.as_deref(), &user.id)
        .await?;
    Ok(ApiResponse::ok(games))
}

async fn list_mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<GameResponse>>> {
    Ok(ApiResponse::ok(state.game_service.list_mine(&user.id).await?))
}

async fn list_hosted(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<GameResponse>>> {
    Ok(ApiResponse::ok(state.game_service.list_hosted(&user.id).await?))
}

async fn list_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<GameResponse>>> {
    Ok(ApiResponse::ok(state.game_service.list_history(&user.id).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGameInput>,
) -> AppResult<ApiResponse<GameResponse>> {
    let game = state.game_service.create(&user, input).await?;
    Ok(ApiResponse::created(game))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GameResponse>> {
    Ok(ApiResponse::ok(state.game_service.get(&id, &user.id).await?))
}

async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<EditGameInput>,
) -> AppResult<ApiResponse<GameResponse>> {
    let game = state.game_service.edit(&id, &user.id, input).await?;
    Ok(ApiResponse::ok(game))
}

async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Confirmation>> {
    state.game_service.delete(&id, &user.id).await?;
    Ok(Confirmation::done())
}

async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GameResponse>> {
    Ok(ApiResponse::ok(state.game_service.join(&id, &user).await?))
}

async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GameResponse>> {
    Ok(ApiResponse::ok(state.game_service.leave(&id, &user.id).await?))
}

async fn invite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> AppResult<ApiResponse<GameResponse>> {
    let game = state
        .game_service
        .invite(&id, &user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(game))
}

/// Poll the chat. With `since`, only newer messages are returned.
async fn chat(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChatQuery>,
) -> AppResult<ApiResponse<Vec<ChatMessageResponse>>> {
    let messages = state
        .game_service
        .get_chat(&id, &user.id, query.since)
        .await?;
    Ok(ApiResponse::ok(messages))
}

async fn post_chat(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<PostChatInput>,
) -> AppResult<ApiResponse<Vec<ChatMessageResponse>>> {
    let messages = state.game_service.post_chat(&id, &user, input).await?;
    Ok(ApiResponse::ok(messages))
}

//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use pickup_common::AppResult;
use pickup_core::{ProfileResponse, UpdateFavoritesInput, UpdateNameInput, UserResponse};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/favorites", put(update_favorites))
        .route("/me/name", put(update_name))
        .route("/{id}/profile", get(profile))
}

/// The caller's own profile.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.user_service.get_profile(&user.id, &user.id).await?;
    Ok(ApiResponse::ok(profile))
}

async fn profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.user_service.get_profile(&id, &user.id).await?;
    Ok(ApiResponse::ok(profile))
}

async fn update_favorites(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateFavoritesInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state
        .user_service
        .update_favorites(&user.id, input)
        .await?;
    Ok(ApiResponse::ok(updated))
}

async fn update_name(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateNameInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state.user_service.update_name(&user.id, input).await?;
    Ok(ApiResponse::ok(updated))
}

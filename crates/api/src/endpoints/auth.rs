//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pickup_common::AppResult;
use pickup_core::{RegisterInput, SessionResponse, SigninInput};

use crate::{middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(signin))
}

/// Create an account and issue a token.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.user_service.register(input).await?;
    Ok(ApiResponse::created(session))
}

/// Sign in with email and password.
async fn signin(
    State(state): State<AppState>,
    Json(input): Json<SigninInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.user_service.signin(input).await?;
    Ok(ApiResponse::ok(session))
}

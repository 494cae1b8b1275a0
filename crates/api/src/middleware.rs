//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use pickup_core::{FriendService, GameService, MessagingService, UserService};
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub game_service: GameService,
    pub friend_service: FriendService,
    pub messaging_service: MessagingService,
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. Requests without a valid token pass through
/// unauthenticated; handlers that need a caller reject them.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}

//! API endpoints.

mod auth;
mod games;
mod social;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/games", games::router())
        .nest("/social", social::router())
        .nest("/users", users::router())
}

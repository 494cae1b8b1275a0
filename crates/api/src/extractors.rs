//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use pickup_common::AppError;
use pickup_db::entities::user;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

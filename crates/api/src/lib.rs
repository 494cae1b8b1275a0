//! HTTP API layer for pickup.
//!
//! - **Endpoints**: auth, games, social and user routes
//! - **Extractors**: the authenticated caller
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;

//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success envelope: `{"data": ...}`.
///
/// Errors are rendered by `AppError` as `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// A 200 response.
    pub const fn ok(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
        }
    }

    /// A 201 response.
    pub const fn created(data: T) -> Self {
        Self {
            data,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Body for operations that only confirm success.
#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub ok: bool,
}

impl Confirmation {
    /// Confirmation envelope.
    #[must_use]
    pub const fn done() -> ApiResponse<Self> {
        ApiResponse::ok(Self { ok: true })
    }
}

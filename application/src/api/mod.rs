//! HTTP API definitions.

pub mod user;

use axum::{routing::get, Extension, Json, Router};
use serde::Serialize;

use crate::Service;

/// Builds the [`Router`] of the whole HTTP API served by the [`Service`].
pub fn router(service: Service) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", user::routes())
        .layer(Extension(service))
}

/// Response of the [`health()`] check.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Health {
    /// Status of the server.
    pub status: &'static str,

    /// Human-readable status description.
    pub message: &'static str,
}

/// Reports that the server is up.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        message: "API is running normally",
    })
}

/// Response carrying a message only.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Message {
    /// Human-readable message.
    pub message: &'static str,
}

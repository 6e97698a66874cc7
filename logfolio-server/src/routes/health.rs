//! Liveness endpoint.

use axum::{response::IntoResponse, Json};

pub(super) async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "logfolio",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

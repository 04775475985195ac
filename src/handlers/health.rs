// src/handlers/health.rs

use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = OK, description = "Service is up")),
    tag = "health"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

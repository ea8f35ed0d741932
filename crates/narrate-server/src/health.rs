use axum::response::IntoResponse;
use http::StatusCode;

/// Liveness probe; answers without touching the engine or the filesystem
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

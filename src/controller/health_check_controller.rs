use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET liveness check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}

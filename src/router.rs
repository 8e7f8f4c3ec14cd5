use crate::controller::{event_controller, health_check_controller};
use crate::state::AppState;
use axum::routing::get;
use axum::Router;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(event_routes(app_state))
        .merge(health_routes())
}

fn event_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/events",
            get(event_controller::subscribe).post(event_controller::publish),
        )
        .route("/stats", get(event_controller::stats))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

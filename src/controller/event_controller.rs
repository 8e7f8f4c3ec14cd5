use crate::params::event::PublishParams;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;
use sse::Event;

/// GET attach a new long-lived event stream.
///
/// The stream is admitted (or rejected with 403) by the handler's admission
/// predicate and stays open until the client disconnects.
pub async fn subscribe(
    State(app_state): State<AppState>,
    request: Request,
) -> Result<Response, sse::Error> {
    let (parts, _body) = request.into_parts();
    debug!("GET Subscribe a new event stream");

    app_state.handler.subscribe(&parts)
}

/// POST publish an event to all attached streams.
///
/// Best-effort fan-out: streams that are not ready to receive get nothing,
/// and that is not an error. Responds with the current stream count.
pub async fn publish(
    State(app_state): State<AppState>,
    Json(params): Json<PublishParams>,
) -> Result<impl IntoResponse, sse::Error> {
    debug!("POST Publish a new event from: {params:?}");

    let event = Event::from(params);
    app_state.handler.publish(&app_state.shutdown, &event)?;

    Ok(Json(json!({ "streams": app_state.handler.streams() })))
}

/// GET a snapshot of how many streams are currently attached.
pub async fn stats(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "streams": app_state.handler.streams() }))
}

use sse::Handler;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    /// The SSE handler; `subscribe` and `publish` both go through it.
    pub handler: Arc<Handler>,
    /// Process-wide shutdown token; cancelling it aborts in-flight
    /// broadcasts.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(handler: Arc<Handler>, shutdown: CancellationToken) -> Self {
        Self { handler, shutdown }
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The admission predicate rejected the request; no registration occurred.
    #[error("sse: request not permitted")]
    NotPermitted,

    /// The streaming response could not be constructed; no registration
    /// occurred.
    #[error("sse: unable to create sender: {0}")]
    Unstreamable(#[from] axum::http::Error),

    /// The caller's cancellation token fired mid-broadcast. Entries not yet
    /// reached are never delivered to.
    #[error("sse: broadcast canceled")]
    Canceled,

    /// The connection's transport is gone. Local to one delivery loop, never
    /// surfaced to producers.
    #[error("sse: stream disconnected")]
    Disconnected,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotPermitted => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            Error::Unstreamable(_) | Error::Canceled | Error::Disconnected => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

use crate::error::{Error, Result};
use crate::event::Event;
use async_stream::stream;
use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use bytes::Bytes;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Capacity of the transport channel. One in-flight chunk gives flush-like
/// backpressure: `send` resolves only once hyper has taken the previous
/// chunk off the channel.
const TRANSPORT_CAPACITY: usize = 1;

/// Writes events onto one open connection.
///
/// A `Sender` is owned exclusively by its connection's delivery loop; no
/// locking is needed around `send`.
pub struct Sender {
    transport: mpsc::Sender<Bytes>,
}

impl Sender {
    /// Build a sender and the streaming response it feeds.
    ///
    /// The response carries the event-stream content type, disables caching,
    /// requests a persistent connection, and allows cross-origin access. The
    /// headers reach the client as soon as the handler returns the response,
    /// before the first event, so the stream counts as open immediately.
    pub fn create() -> Result<(Self, Response)> {
        let (transport, mut chunks) = mpsc::channel::<Bytes>(TRANSPORT_CAPACITY);
        let body = Body::from_stream(stream! {
            while let Some(chunk) = chunks.recv().await {
                yield Ok::<_, Infallible>(chunk);
            }
        });
        let response = Response::builder()
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive")
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(body)?;
        Ok((Self { transport }, response))
    }

    /// Serialize an event and hand it to the transport, resolving once the
    /// transport has accepted the bytes. Returns the number of bytes written.
    ///
    /// Fails with `Error::Disconnected` when the client side of the
    /// transport is gone; the delivery loop does not retry.
    pub async fn send(&self, event: &Event) -> Result<usize> {
        let payload = event.format();
        let written = payload.len();
        self.transport
            .send(payload)
            .await
            .map_err(|_| Error::Disconnected)?;
        Ok(written)
    }

    /// Resolves when the client disconnects (the response body is dropped).
    /// This is the delivery loop's cancellation signal.
    pub async fn closed(&self) {
        self.transport.closed().await
    }
}

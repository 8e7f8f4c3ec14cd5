use crate::error::{Error, Result};
use crate::event::Event;
use crate::registry::Registry;
use crate::sender::Sender;
use axum::http::header::ACCEPT;
use axum::http::request::Parts;
use axum::response::Response;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Permit = Box<dyn Fn(&Parts) -> bool + Send + Sync>;
type Identity = Box<dyn Fn(&Parts) -> String + Send + Sync>;

/// Orchestrates stream lifetimes and exposes the producer entry point.
///
/// One `Handler` owns the registry of attached streams. Wrap it in an `Arc`
/// and call [`Handler::subscribe`] from the HTTP surface for each inbound
/// stream request; call [`Handler::publish`] from any number of producer
/// tasks.
pub struct Handler {
    permit: Permit,
    identity: Identity,
    registry: Registry,
}

/// The default admission predicate: permit a request iff it claims to accept
/// an event stream.
fn default_permit(parts: &Parts) -> bool {
    parts
        .headers
        .get(ACCEPT)
        .is_some_and(|accept| accept.as_bytes() == b"text/event-stream")
}

impl Handler {
    /// Handler with the default admission predicate and a counter-backed
    /// identity function. The counter lives for as long as the handler and
    /// is never reset.
    pub fn new() -> Self {
        let counter = AtomicI64::new(0);
        Self {
            permit: Box::new(default_permit),
            identity: Box::new(move |_parts| {
                (counter.fetch_add(1, Ordering::Relaxed) + 1).to_string()
            }),
            registry: Registry::new(),
        }
    }

    /// Replace the admission predicate, evaluated once per connection before
    /// registration.
    pub fn with_permit<F>(mut self, permit: F) -> Self
    where
        F: Fn(&Parts) -> bool + Send + Sync + 'static,
    {
        self.permit = Box::new(permit);
        self
    }

    /// Replace the identity function, evaluated once per connection. The
    /// returned string is the registry key.
    pub fn with_identity<F>(mut self, identity: F) -> Self
    where
        F: Fn(&Parts) -> String + Send + Sync + 'static,
    {
        self.identity = Box::new(identity);
        self
    }

    /// Admit one inbound stream request.
    ///
    /// On success the stream is registered, its delivery loop is spawned,
    /// and the streaming response is returned; the loop runs until the
    /// client disconnects and then deregisters itself. A rejected request
    /// gets `Error::NotPermitted` (403) with no registry interaction; a
    /// failed sender creation gets `Error::Unstreamable` (500) with no
    /// registration.
    pub fn subscribe(self: &Arc<Self>, parts: &Parts) -> Result<Response> {
        if !(self.permit)(parts) {
            return Err(Error::NotPermitted);
        }
        let (sender, response) = Sender::create()?;
        let id = (self.identity)(parts);
        let events = self.registry.set(&id);
        info!("sse: stream {id} attached");
        tokio::spawn(Arc::clone(self).deliver(id, events, sender));
        Ok(response)
    }

    /// Offer an event to every attached stream.
    ///
    /// Never blocks on a consumer: a stream that is still flushing a
    /// previous event gets nothing for this call, and that is not an error.
    /// Callable concurrently from any number of producers; the only error is
    /// `Error::Canceled` when `cancel` fires mid-broadcast.
    pub fn publish(&self, cancel: &CancellationToken, event: &Event) -> Result<()> {
        self.registry.broadcast(cancel, event)
    }

    /// Number of currently attached streams.
    pub fn streams(&self) -> usize {
        self.registry.len()
    }

    /// The per-stream delivery loop: wait for whichever comes first, the
    /// next event or disconnection. A failed write is logged and the loop
    /// keeps going; only disconnection (or displacement by a duplicate
    /// identity) ends it.
    async fn deliver(self: Arc<Self>, id: String, mut events: mpsc::Receiver<Event>, sender: Sender) {
        let deregister = Deregister {
            handler: Arc::clone(&self),
            id: id.clone(),
            armed: true,
        };
        loop {
            tokio::select! {
                next = events.recv() => match next {
                    Some(event) => {
                        if let Err(err) = sender.send(&event).await {
                            warn!("sse: failed to write event to stream {id}: {err}");
                        }
                    }
                    // The registry entry was displaced by a duplicate
                    // identity and now belongs to the new registration, so
                    // this loop must not remove it on the way out.
                    None => {
                        debug!("sse: stream {id} was displaced");
                        deregister.disarm();
                        return;
                    }
                },
                () = sender.closed() => break,
            }
        }
        info!("sse: stream {id} disconnected");
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a stream's registry entry when dropped, so deregistration happens
/// on every exit path of the delivery loop.
struct Deregister {
    handler: Arc<Handler>,
    id: String,
    armed: bool,
}

impl Deregister {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Deregister {
    fn drop(&mut self) {
        if self.armed {
            self.handler.registry.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::Request;
    use std::time::Duration;

    fn parts(accept: Option<&str>) -> Parts {
        let mut request = Request::builder().uri("/events");
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        request.body(()).unwrap().into_parts().0
    }

    async fn wait_for_streams(handler: &Handler, expected: usize) {
        for _ in 0..100 {
            if handler.streams() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {expected} streams, still have {}",
            handler.streams()
        );
    }

    #[test]
    fn default_permit_requires_event_stream_accept() {
        assert!(default_permit(&parts(Some("text/event-stream"))));
        assert!(!default_permit(&parts(Some("text/html"))));
        assert!(!default_permit(&parts(None)));
    }

    #[test]
    fn default_identity_is_monotonic() {
        let handler = Handler::new();
        let first = (handler.identity)(&parts(None));
        let second = (handler.identity)(&parts(None));
        let third = (handler.identity)(&parts(None));
        assert_eq!(first, "1");
        assert_eq!(second, "2");
        assert_eq!(third, "3");
    }

    #[test]
    fn counters_are_scoped_per_handler() {
        let first = Handler::new();
        let second = Handler::new();
        assert_eq!((first.identity)(&parts(None)), "1");
        assert_eq!((second.identity)(&parts(None)), "1");
    }

    #[tokio::test]
    async fn rejected_request_never_touches_the_registry() {
        let handler = Arc::new(Handler::new());
        let err = handler.subscribe(&parts(None)).unwrap_err();
        assert!(matches!(err, Error::NotPermitted));
        assert_eq!(handler.streams(), 0);
    }

    #[tokio::test]
    async fn subscribe_attaches_and_disconnect_detaches() {
        let handler = Arc::new(Handler::new());
        let response = handler.subscribe(&parts(Some("text/event-stream"))).unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE.as_str()], "text/event-stream");
        assert_eq!(handler.streams(), 1);

        // Dropping the response drops the body, which the delivery loop
        // observes as a disconnect.
        drop(response);
        wait_for_streams(&handler, 0).await;
    }

    #[tokio::test]
    async fn custom_collaborators_are_used() {
        let handler = Arc::new(
            Handler::new()
                .with_permit(|_| true)
                .with_identity(|parts| parts.uri.path().to_owned()),
        );
        let response = handler.subscribe(&parts(None)).unwrap();
        assert_eq!(handler.streams(), 1);

        // Publishing with no loop ready yet lands in the delivery slot.
        let cancel = CancellationToken::new();
        handler.publish(&cancel, &Event::new("hello")).unwrap();

        drop(response);
        wait_for_streams(&handler, 0).await;
    }

    #[tokio::test]
    async fn publish_with_no_streams_is_ok() {
        let handler = Arc::new(Handler::new());
        let cancel = CancellationToken::new();
        assert!(handler.publish(&cancel, &Event::new("hello")).is_ok());
    }
}

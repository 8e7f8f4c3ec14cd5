use crate::error::{Error, Result};
use crate::event::Event;
use log::{debug, trace, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Capacity of a delivery channel. There is no zero-capacity rendezvous
/// channel in tokio; a single slot plus `try_send` is the closest
/// non-blocking handoff: a broadcast only lands when the delivery loop has
/// drained the previous event, and nothing is ever queued behind it.
const DELIVERY_CAPACITY: usize = 1;

struct Client {
    events: mpsc::Sender<Event>,
}

/// Registry of attached streams.
///
/// The sole shared mutable structure: a map from connection identity to
/// delivery channel, guarded by a reader/writer lock. `broadcast` takes the
/// shared lock so concurrent broadcasts never block each other; `set` and
/// `remove` take the exclusive lock.
pub struct Registry {
    clients: RwLock<HashMap<String, Client>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Register a stream and return the receiving half of its delivery
    /// channel.
    ///
    /// A duplicate identity silently displaces the previous entry; dropping
    /// the displaced entry's sender closes its channel, so the old delivery
    /// loop observes the closure and exits.
    pub fn set(&self, id: &str) -> mpsc::Receiver<Event> {
        let (events, delivery) = mpsc::channel(DELIVERY_CAPACITY);
        let mut clients = self.clients.write();
        if clients.insert(id.to_owned(), Client { events }).is_some() {
            warn!("sse: stream {id} displaced an existing registration");
        }
        delivery
    }

    /// Remove a stream's entry; no-op if absent. After removal no broadcast
    /// can target the identity.
    pub fn remove(&self, id: &str) {
        if self.clients.write().remove(id).is_some() {
            debug!("sse: stream {id} removed");
        }
    }

    /// Offer an event to every registered stream without blocking on any of
    /// them.
    ///
    /// Per entry, in unspecified order: abort with `Error::Canceled` if the
    /// caller's token has fired; otherwise attempt a non-blocking handoff.
    /// A stream whose delivery loop is busy gets nothing for this call (the
    /// event is dropped, not an error), and a stream whose loop has already
    /// exited is skipped. Returns `Ok(())` on best-effort completion.
    pub fn broadcast(&self, cancel: &CancellationToken, event: &Event) -> Result<()> {
        let clients = self.clients.read();
        for (id, client) in clients.iter() {
            if cancel.is_cancelled() {
                return Err(Error::Canceled);
            }
            match client.events.try_send(event.clone()) {
                Ok(()) => trace!("sse: sent event to {id}"),
                Err(TrySendError::Full(_)) => {
                    debug!("sse: stream {id} is busy, dropping event")
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("sse: stream {id} is gone, dropping event")
                }
            }
        }
        Ok(())
    }

    /// Number of registered streams.
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[tokio::test]
    async fn broadcast_with_no_streams_succeeds() {
        let registry = Registry::new();
        let cancel = CancellationToken::new();
        assert!(registry.broadcast(&cancel, &Event::new("hello")).is_ok());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reaches_registered_stream() {
        let registry = Registry::new();
        let cancel = CancellationToken::new();
        let mut delivery = registry.set("1");
        assert_eq!(registry.len(), 1);

        registry.broadcast(&cancel, &Event::new("hello")).unwrap();
        assert_eq!(delivery.try_recv().unwrap(), Event::new("hello"));
    }

    #[tokio::test]
    async fn busy_stream_drops_the_event() {
        let registry = Registry::new();
        let cancel = CancellationToken::new();
        let mut delivery = registry.set("1");

        // Nothing drains the channel between broadcasts, so only the first
        // handoff lands.
        registry.broadcast(&cancel, &Event::new("1")).unwrap();
        registry.broadcast(&cancel, &Event::new("2")).unwrap();

        assert_eq!(delivery.try_recv().unwrap(), Event::new("1"));
        assert_eq!(delivery.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn removed_stream_is_never_delivered_to() {
        let registry = Registry::new();
        let cancel = CancellationToken::new();
        let mut delivery = registry.set("1");
        registry.remove("1");

        assert!(registry.broadcast(&cancel, &Event::new("hello")).is_ok());
        assert_eq!(delivery.try_recv().unwrap_err(), TryRecvError::Disconnected);
    }

    #[tokio::test]
    async fn remove_of_unknown_stream_is_a_noop() {
        let registry = Registry::new();
        registry.remove("nope");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn duplicate_identity_displaces_previous_entry() {
        let registry = Registry::new();
        let cancel = CancellationToken::new();
        let mut first = registry.set("1");
        let mut second = registry.set("1");
        assert_eq!(registry.len(), 1);

        // The displaced channel closes so its loop can exit.
        assert_eq!(first.try_recv().unwrap_err(), TryRecvError::Disconnected);

        registry.broadcast(&cancel, &Event::new("hello")).unwrap();
        assert_eq!(second.try_recv().unwrap(), Event::new("hello"));
    }

    #[tokio::test]
    async fn canceled_broadcast_aborts() {
        let registry = Registry::new();
        let cancel = CancellationToken::new();
        let mut delivery = registry.set("1");

        cancel.cancel();
        let err = registry
            .broadcast(&cancel, &Event::new("hello"))
            .unwrap_err();
        assert!(matches!(err, Error::Canceled));
        assert_eq!(delivery.try_recv().unwrap_err(), TryRecvError::Empty);
    }
}

//! Server-Sent Events (SSE) broadcast core.
//!
//! This crate pushes discrete, typed messages from a single producer to many
//! concurrently connected long-lived HTTP streams, encoded per the SSE wire
//! format.
//!
//! # Architecture
//!
//! - **Registry of attached streams**: a map from connection identity to a
//!   per-connection delivery channel, guarded by a reader/writer lock so
//!   broadcasts run concurrently with each other and exclusively with
//!   attach/detach.
//! - **Non-blocking fan-out**: a broadcast offers the event to every stream
//!   with a `try_send`; a stream whose delivery loop is still flushing the
//!   previous event gets nothing for that call. No buffering and no replay,
//!   so a slow consumer can never block the producer or its peers.
//! - **Ephemeral messages**: an event published while no stream is listening
//!   is simply lost.
//! - **One delivery loop per stream**: a spawned task waits for either the
//!   next event or disconnection, and deregisters itself on every exit path.
//!
//! # Message flow
//!
//! 1. A client requests the stream endpoint; the admission predicate decides
//!    whether it may attach.
//! 2. [`Handler::subscribe`] assigns an identity, registers the delivery
//!    channel, spawns the delivery loop, and returns the streaming response
//!    (headers go out immediately, so the stream is open before the first
//!    event).
//! 3. A producer calls [`Handler::publish`]; the registry offers the event
//!    to every attached stream without blocking on any of them.
//! 4. Each ready delivery loop hands the event to its [`Sender`], which
//!    serializes it with [`Event::format`] and flushes the bytes onto the
//!    open connection.
//! 5. On disconnect the loop exits and the stream's registry entry is
//!    removed.
//!
//! # Example
//!
//! ```rust,ignore
//! use sse::{Event, Handler};
//! use tokio_util::sync::CancellationToken;
//!
//! let handler = std::sync::Arc::new(Handler::new());
//!
//! // From the HTTP surface, per inbound request:
//! // handler.subscribe(&parts)
//!
//! // From any producer task:
//! handler.publish(&CancellationToken::new(), &Event::with_type("tick", "60"))?;
//! ```
//!
//! # Modules
//!
//! - `event`: the immutable event value and its wire serialization
//! - `sender`: per-connection writer over the streaming response body
//! - `registry`: shared map of attached streams with the broadcast fan-out
//! - `handler`: connection lifecycle and the producer-facing publish surface
//! - `error`: error taxonomy with HTTP status mapping

pub mod error;
pub mod event;
pub mod handler;
pub mod registry;
pub mod sender;

pub use error::{Error, Result};
pub use event::Event;
pub use handler::Handler;
pub use registry::Registry;
pub use sender::Sender;

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// A single server-sent event.
///
/// Immutable value object; construct one per publish and let the registry
/// offer it to every attached stream. Cloning is cheap because the payload
/// is `Bytes`.
///
/// Wire format per <https://html.spec.whatwg.org/multipage/server-sent-events.html#event-stream-interpretation>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Optional event id (`id:` field).
    pub id: Option<String>,
    /// Optional event type tag (`event:` field).
    pub event_type: Option<String>,
    /// Payload bytes; may be empty.
    pub data: Bytes,
    /// Optional reconnection delay hint in milliseconds (`retry:` field).
    pub retry: Option<u32>,
}

impl Event {
    /// Event carrying only a payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Event with a type tag and a payload.
    pub fn with_type(event_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Serialize the event into its wire representation.
    ///
    /// Fields are emitted in fixed order, each only when non-default. The
    /// payload is split on `\n` and emitted as one `data:` line per chunk so
    /// multi-line payloads survive the line-oriented format. An empty payload
    /// still emits a single `data: \n` line, so every record carries at least
    /// one data field. A single blank line terminates the record.
    ///
    /// No escaping is performed; that is the wire format's own limitation.
    pub fn format(&self) -> Bytes {
        let mut buf = BytesMut::new();
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            buf.put_slice(b"id: ");
            buf.put_slice(id.as_bytes());
            buf.put_u8(b'\n');
        }
        if let Some(event_type) = self.event_type.as_deref().filter(|t| !t.is_empty()) {
            buf.put_slice(b"event: ");
            buf.put_slice(event_type.as_bytes());
            buf.put_u8(b'\n');
        }
        if self.data.is_empty() {
            buf.put_slice(b"data: \n");
        } else {
            for line in self.data.split(|byte| *byte == b'\n') {
                buf.put_slice(b"data: ");
                buf.put_slice(line);
                buf.put_u8(b'\n');
            }
        }
        if let Some(retry) = self.retry.filter(|ms| *ms > 0) {
            buf.put_slice(b"retry: ");
            buf.put_slice(retry.to_string().as_bytes());
            buf.put_u8(b'\n');
        }
        buf.put_u8(b'\n');
        buf.freeze()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.format()))
    }
}

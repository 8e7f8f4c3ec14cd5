use serde::Deserialize;
use sse::Event;

/// Request body for publishing an event to all attached streams.
#[derive(Debug, Deserialize)]
pub struct PublishParams {
    /// Optional event id.
    pub id: Option<String>,
    /// Optional event type tag.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Payload; may be empty or multi-line.
    #[serde(default)]
    pub data: String,
    /// Optional reconnection delay hint in milliseconds.
    pub retry: Option<u32>,
}

impl From<PublishParams> for Event {
    fn from(params: PublishParams) -> Self {
        Event {
            id: params.id,
            event_type: params.event_type,
            data: params.data.into(),
            retry: params.retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_body_becomes_an_event() {
        let params: PublishParams =
            serde_json::from_str(r#"{"id":"7","type":"test","data":"hello","retry":250}"#).unwrap();
        let event = Event::from(params);
        assert_eq!(
            event,
            Event {
                id: Some("7".into()),
                event_type: Some("test".into()),
                data: "hello".into(),
                retry: Some(250),
            }
        );
    }

    #[test]
    fn data_defaults_to_empty() {
        let params: PublishParams = serde_json::from_str("{}").unwrap();
        let event = Event::from(params);
        assert_eq!(event, Event::default());
    }
}

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One relayed event. Serializes to `{"content":..}`, `{"done":true}` or
/// `{"error":..}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    Done,
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Content(_))
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            StreamEvent::Content(text) => map.serialize_entry("content", text)?,
            StreamEvent::Done => map.serialize_entry("done", &true)?,
            StreamEvent::Error(msg) => map.serialize_entry("error", msg)?,
        }
        map.end()
    }
}

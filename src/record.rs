//! Event records and the raw records fed in by the host collector.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Caller-supplied attributes. Insertion order is preserved on the wire.
pub type Attributes = Map<String, Value>;

/// A record as delivered by the host collector, before timestamp allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingRecord {
    /// Logical source of the record.
    pub tag: String,
    /// Emission time in whole seconds since the Unix epoch.
    pub timestamp_secs: u64,
    /// Structured attributes, passed through untouched.
    pub attributes: Attributes,
}

impl IncomingRecord {
    /// Construct a record from its parts.
    pub fn new(tag: impl Into<String>, timestamp_secs: u64, attributes: Attributes) -> Self {
        Self {
            tag: tag.into(),
            timestamp_secs,
            attributes,
        }
    }
}

/// A record with its delivery timestamp and thread resolved.
///
/// Records are only created by [`BatchBuilder`](crate::batch::BatchBuilder)
/// and cannot be modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    timestamp: u64,
    attributes: Attributes,
    thread_id: String,
}

impl EventRecord {
    pub(crate) fn new(timestamp: u64, attributes: Attributes, thread_id: String) -> Self {
        Self {
            timestamp,
            attributes,
            thread_id,
        }
    }

    /// Allocated delivery timestamp in nanoseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Attributes exactly as supplied.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Thread id resolved from the record's tag.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

/// Wire shape: `{"ts": "<nanos>", "attrs": {...}, "thread": "<id>"}`.
///
/// `ts` is rendered as a decimal string holding the full 64-bit value.
impl Serialize for EventRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("ts", &format_args!("{}", self.timestamp))?;
        map.serialize_entry("attrs", &self.attributes)?;
        map.serialize_entry("thread", &self.thread_id)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_timestamp_as_string() {
        let attrs = json!({"a": 1}).as_object().cloned().unwrap_or_default();
        let record = EventRecord::new(1_427_882_400_000_000_000, attrs, "1".into());
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            value,
            json!({"ts": "1427882400000000000", "attrs": {"a": 1}, "thread": "1"})
        );
    }

    #[test]
    fn preserves_attribute_order() {
        let attrs = json!({"zeta": 1, "alpha": 2, "mid": 3})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let record = EventRecord::new(1, attrs, "1".into());
        let text = serde_json::to_string(&record).expect("serialize");
        let zeta = text.find("zeta").expect("zeta");
        let alpha = text.find("alpha").expect("alpha");
        assert!(zeta < alpha);
    }
}

//! Fixtures providing batches and sessions that do not share timestamp
//! state with other tests in the same binary.

use femtoship::{Attributes, BatchBuilder, Session, TimestampAllocator};
use rstest::fixture;
use serde_json::Value;

/// Convert a JSON object literal into an attribute map.
pub fn attrs(value: Value) -> Attributes {
    value.as_object().cloned().unwrap_or_default()
}

/// A batch backed by its own timestamp allocator.
#[fixture]
pub fn fresh_batch() -> BatchBuilder {
    BatchBuilder::with_allocator(Box::leak(Box::new(TimestampAllocator::new())))
}

/// A session without metadata.
#[fixture]
pub fn session() -> Session {
    Session::with_id("test-token", "test-session", Attributes::new())
}

/// A session carrying `{"test": "value"}` as metadata.
#[fixture]
pub fn session_with_info() -> Session {
    Session::with_id(
        "test-token",
        "test-session",
        attrs(serde_json::json!({"test": "value"})),
    )
}

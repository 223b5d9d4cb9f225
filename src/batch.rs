//! Accumulation of event records into a renderable batch.

use std::io;

use log::error;
use thiserror::Error;

use crate::clock::TimestampAllocator;
use crate::envelope::{Session, UploadEnvelope};
use crate::record::{Attributes, EventRecord, IncomingRecord};
use crate::thread_registry::ThreadRegistry;

/// Fixed per-event overhead added to the attribute size estimate.
///
/// Covers the `ts`, `attrs` and `thread` keys, a 19-digit timestamp and
/// punctuation.
const EVENT_OVERHEAD_BYTES: usize = 48;

/// Errors raised when a batch is used outside its lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// The batch was already rendered and must be reset before reuse.
    #[error("batch already rendered; reset it before appending or rendering again")]
    Finalized,
}

/// Builds one batch of events and renders it into an [`UploadEnvelope`].
///
/// Appends are single-writer (`&mut self`). Timestamps come from a shared
/// [`TimestampAllocator`], the process-wide one unless overridden.
#[derive(Debug)]
pub struct BatchBuilder {
    allocator: &'static TimestampAllocator,
    events: Vec<EventRecord>,
    threads: ThreadRegistry,
    estimated_bytes: usize,
    finalized: bool,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchBuilder {
    /// Create an empty batch drawing timestamps from the global allocator.
    pub fn new() -> Self {
        Self::with_allocator(TimestampAllocator::global())
    }

    /// Create an empty batch drawing timestamps from `allocator`.
    pub fn with_allocator(allocator: &'static TimestampAllocator) -> Self {
        Self {
            allocator,
            events: Vec::new(),
            threads: ThreadRegistry::new(),
            estimated_bytes: 0,
            finalized: false,
        }
    }

    /// Append a record emitted by `tag` at `timestamp_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Finalized`] if the batch was already rendered.
    pub fn append(
        &mut self,
        tag: &str,
        timestamp_secs: u64,
        attributes: Attributes,
    ) -> Result<(), BatchError> {
        self.ensure_open("append")?;
        let timestamp = self.allocator.allocate(timestamp_secs);
        let known_threads = self.threads.len();
        let thread_id = self.threads.resolve(tag).to_owned();
        self.estimated_bytes += estimate_event_bytes(&attributes, &thread_id);
        if self.threads.len() > known_threads {
            self.estimated_bytes += estimate_thread_bytes(tag);
        }
        self.events
            .push(EventRecord::new(timestamp, attributes, thread_id));
        Ok(())
    }

    /// Append a record received from the host collector.
    pub fn append_record(&mut self, record: IncomingRecord) -> Result<(), BatchError> {
        let IncomingRecord {
            tag,
            timestamp_secs,
            attributes,
        } = record;
        self.append(&tag, timestamp_secs, attributes)
    }

    /// Render the batch into an envelope for `session`.
    ///
    /// The events and threads move into the envelope and the batch is
    /// finalized until [`reset`](Self::reset) is called.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Finalized`] if the batch was already rendered.
    pub fn render(&mut self, session: &Session) -> Result<UploadEnvelope, BatchError> {
        self.ensure_open("render")?;
        self.finalized = true;
        self.estimated_bytes = 0;
        let events = std::mem::take(&mut self.events);
        let threads = self.threads.take_entries();
        Ok(UploadEnvelope::new(session, events, threads))
    }

    /// Discard any content and reopen the batch with an empty thread registry.
    pub fn reset(&mut self) {
        self.events.clear();
        self.threads.clear();
        self.estimated_bytes = 0;
        self.finalized = false;
    }

    /// Number of events appended since the last reset.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event has been appended since the last reset.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of distinct tags seen since the last reset.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Approximate size of the rendered `events` and `threads` arrays.
    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes
    }

    /// Whether the batch has been rendered and awaits a reset.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure_open(&self, operation: &str) -> Result<(), BatchError> {
        if self.finalized {
            error!("BatchBuilder::{operation} called on a rendered batch");
            return Err(BatchError::Finalized);
        }
        Ok(())
    }
}

/// Sink that only counts the bytes written to it.
#[derive(Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn serialized_len(attributes: &Attributes) -> usize {
    let mut counter = ByteCounter::default();
    match serde_json::to_writer(&mut counter, attributes) {
        Ok(()) => counter.0,
        Err(_) => 0,
    }
}

fn estimate_event_bytes(attributes: &Attributes, thread_id: &str) -> usize {
    EVENT_OVERHEAD_BYTES + serialized_len(attributes) + thread_id.len()
}

fn estimate_thread_bytes(tag: &str) -> usize {
    // {"id":"","name":""},
    20 + tag.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    #[fixture]
    fn batch() -> BatchBuilder {
        BatchBuilder::with_allocator(Box::leak(Box::new(TimestampAllocator::new())))
    }

    #[fixture]
    fn session() -> Session {
        Session::with_id("token", "session", Attributes::new())
    }

    #[rstest]
    fn counts_events_and_distinct_tags(mut batch: BatchBuilder) {
        batch.append("a", 1, attrs(json!({"n": 1}))).expect("append");
        batch.append("b", 1, attrs(json!({"n": 2}))).expect("append");
        batch.append("a", 1, attrs(json!({"n": 3}))).expect("append");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.thread_count(), 2);
    }

    #[rstest]
    fn render_moves_content_into_envelope(mut batch: BatchBuilder, session: Session) {
        batch.append("a", 1, attrs(json!({"n": 1}))).expect("append");
        let envelope = batch.render(&session).expect("render");
        assert_eq!(envelope.events.len(), 1);
        assert_eq!(envelope.threads.len(), 1);
        assert!(batch.is_finalized());
        assert!(batch.is_empty());
    }

    #[rstest]
    fn append_after_render_is_rejected(mut batch: BatchBuilder, session: Session) {
        batch.append("a", 1, Attributes::new()).expect("append");
        batch.render(&session).expect("render");
        assert_eq!(
            batch.append("a", 2, Attributes::new()),
            Err(BatchError::Finalized)
        );
    }

    #[rstest]
    fn render_twice_is_rejected(mut batch: BatchBuilder, session: Session) {
        batch.render(&session).expect("render");
        assert_eq!(batch.render(&session), Err(BatchError::Finalized));
    }

    #[rstest]
    fn reset_reopens_and_restarts_thread_ids(mut batch: BatchBuilder, session: Session) {
        batch.append("x", 1, Attributes::new()).expect("append");
        batch.append("y", 1, Attributes::new()).expect("append");
        batch.render(&session).expect("render");
        batch.reset();
        batch.append("y", 1, Attributes::new()).expect("append");
        let envelope = batch.render(&session).expect("render");
        assert_eq!(envelope.threads[0].id, "1");
        assert_eq!(envelope.threads[0].name, "y");
    }

    #[rstest]
    fn size_estimate_grows_and_clears(mut batch: BatchBuilder, session: Session) {
        assert_eq!(batch.estimated_bytes(), 0);
        batch
            .append("tag", 1, attrs(json!({"message": "hello world"})))
            .expect("append");
        let one = batch.estimated_bytes();
        assert!(one > "{\"message\":\"hello world\"}".len());
        batch.append("tag", 1, attrs(json!({"message": "again"}))).expect("append");
        assert!(batch.estimated_bytes() > one);
        batch.render(&session).expect("render");
        assert_eq!(batch.estimated_bytes(), 0);
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"message": "caf\u{e9}", "n": 1.5, "nested": {"list": [1, null, true]}}))]
    fn attribute_size_matches_serialized_length(#[case] value: serde_json::Value) {
        let attributes = attrs(value);
        let expected = serde_json::to_string(&attributes).expect("serialize").len();
        assert_eq!(serialized_len(&attributes), expected);
    }

    #[rstest]
    fn first_event_estimate_covers_event_and_thread(mut batch: BatchBuilder) {
        let attributes = attrs(json!({"message": "hello"}));
        let attrs_len = serde_json::to_string(&attributes).expect("serialize").len();
        batch.append("web", 1, attributes).expect("append");
        assert_eq!(
            batch.estimated_bytes(),
            EVENT_OVERHEAD_BYTES + attrs_len + "1".len() + 20 + "web".len()
        );
    }
}

//! Interface through which the host collector feeds records.

use thiserror::Error;

use crate::record::{Attributes, IncomingRecord};

/// Reasons a record could not be accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The queue is at capacity; the record was dropped.
    #[error("queue full, record dropped")]
    QueueFull,
    /// The sink has shut down; the record was dropped.
    #[error("sink closed, record dropped")]
    Closed,
}

/// Trait implemented by anything that accepts records from the host.
///
/// `emit` must not block on network I/O.
pub trait EventSink: Send + Sync {
    /// Accept one record.
    fn emit(&self, record: IncomingRecord) -> Result<(), EmitError>;

    /// Deliver everything accepted so far. Returns `true` once the sink
    /// acknowledged the flush within its timeout.
    fn flush(&self) -> bool;

    /// Convenience wrapper matching the host callback signature.
    fn emit_parts(
        &self,
        tag: &str,
        timestamp_secs: u64,
        attributes: Attributes,
    ) -> Result<(), EmitError> {
        self.emit(IncomingRecord::new(tag, timestamp_secs, attributes))
    }
}

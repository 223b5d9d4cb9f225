//! Monotonic delivery timestamps.
//!
//! Log sources usually report emission time with second resolution, so
//! several records routinely share a timestamp and clock adjustments can
//! make a later record look older than an earlier one. The ingestion
//! endpoint orders events by their `ts` field, so every record receives a
//! nanosecond value that is strictly greater than any value handed out
//! before it.
//!
//! [`allocate`] uses a process-wide allocator so ordering holds across all
//! batches, whichever stream a record ends up in.

use std::sync::atomic::{AtomicU64, Ordering};

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

static GLOBAL_ALLOCATOR: TimestampAllocator = TimestampAllocator::new();

/// Hands out strictly increasing nanosecond timestamps.
#[derive(Debug, Default)]
pub struct TimestampAllocator {
    last_allocated: AtomicU64,
}

impl TimestampAllocator {
    /// Create an allocator that has not handed out any timestamp yet.
    pub const fn new() -> Self {
        Self {
            last_allocated: AtomicU64::new(0),
        }
    }

    /// Return the allocator shared by the whole process.
    pub fn global() -> &'static TimestampAllocator {
        &GLOBAL_ALLOCATOR
    }

    /// Allocate a timestamp for a record emitted at `source_secs`.
    ///
    /// The source time is scaled to nanoseconds. If that baseline does not
    /// exceed the last value handed out, the result is the last value plus
    /// one; otherwise the baseline is returned unchanged. A source too large
    /// to scale carries no usable baseline and is treated as not exceeding
    /// the last value.
    pub fn allocate(&self, source_secs: u64) -> u64 {
        self.advance(source_secs.checked_mul(NANOS_PER_SEC))
    }

    /// Allocate a timestamp for a source that already carries nanoseconds.
    pub fn allocate_nanos(&self, baseline: u64) -> u64 {
        self.advance(Some(baseline))
    }

    fn advance(&self, baseline: Option<u64>) -> u64 {
        // `u64::MAX` is never adopted as a baseline so the successor of any
        // adopted value stays representable.
        let next = |last: u64| match baseline {
            Some(baseline) if baseline > last && baseline < u64::MAX => baseline,
            _ => last.saturating_add(1),
        };
        // The closure never declines, so both arms carry the previous value.
        let (Ok(previous) | Err(previous)) =
            self.last_allocated
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                    Some(next(last))
                });
        next(previous)
    }

    /// The most recent value returned by this allocator, or zero.
    pub fn last_allocated(&self) -> u64 {
        self.last_allocated.load(Ordering::Acquire)
    }
}

/// Allocate a timestamp from the process-wide allocator.
pub fn allocate(source_secs: u64) -> u64 {
    GLOBAL_ALLOCATOR.allocate(source_secs)
}

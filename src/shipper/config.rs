//! Configuration structures consumed by the shipper lifecycle.
//!
//! [`ShipperBuilder`](crate::builder::ShipperBuilder) and the INI loader
//! construct these values before passing them to
//! [`EventShipper`](super::EventShipper) for runtime use.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::backoff::BackoffPolicy;
use crate::envelope::UploadEnvelope;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;
use crate::record::Attributes;
use crate::uploader::DeliveryResult;

/// Default ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www.scalyr.com/addEvents";
/// Default bounded channel capacity between producers and the worker.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default event count that triggers a flush.
pub const DEFAULT_MAX_BATCH_EVENTS: usize = 1000;
/// Default estimated payload size that triggers a flush.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 3_000_000;
/// Default interval after which a non-empty batch is flushed.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default request timeout.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default time a caller waits for an explicit flush or shutdown.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// An envelope the shipper gave up on, handed back intact.
#[derive(Clone, Debug)]
pub struct UndeliveredBatch {
    pub envelope: UploadEnvelope,
    /// Outcome of the final attempt.
    pub outcome: DeliveryResult,
}

/// Configuration object describing how to construct an
/// [`EventShipper`](super::EventShipper).
#[derive(Clone)]
pub struct ShipperConfig {
    /// API token placed in every envelope.
    pub api_token: String,
    /// Ingestion endpoint URL.
    pub endpoint: String,
    /// Static session metadata; omitted from envelopes when empty.
    pub session_info: Attributes,
    /// Additional HTTP headers to include in requests.
    pub headers: HashMap<String, String>,
    /// Bounded channel capacity for the producer-consumer queue.
    pub capacity: usize,
    pub max_batch_events: usize,
    pub max_batch_bytes: usize,
    pub flush_interval: Duration,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    /// Bound on how long `flush` and `close` wait for the worker.
    pub flush_timeout: Duration,
    /// Redelivery policy for retryable failures.
    pub backoff: BackoffPolicy,
    /// Interval between rate-limited warnings.
    pub warn_interval: Duration,
    /// Receives envelopes that could not be delivered.
    pub overflow: Option<Sender<UndeliveredBatch>>,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            session_info: Attributes::new(),
            headers: HashMap::new(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            max_batch_events: DEFAULT_MAX_BATCH_EVENTS,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            backoff: BackoffPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
            overflow: None,
        }
    }
}

impl std::fmt::Debug for ShipperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipperConfig")
            .field("endpoint", &self.endpoint)
            .field("session_info", &self.session_info)
            .field("capacity", &self.capacity)
            .field("max_batch_events", &self.max_batch_events)
            .field("max_batch_bytes", &self.max_batch_bytes)
            .field("flush_interval", &self.flush_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("flush_timeout", &self.flush_timeout)
            .field("backoff", &self.backoff)
            .field("overflow", &self.overflow.is_some())
            .finish_non_exhaustive()
    }
}

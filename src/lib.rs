//! Event delivery core for shipping structured logs to an `addEvents`
//! style ingestion endpoint.
//!
//! Records flow through [`BatchBuilder`], which stamps each one with a
//! strictly increasing timestamp from the process-wide
//! [`TimestampAllocator`] and groups them into logical threads by tag. A
//! rendered [`UploadEnvelope`] is posted by an [`Uploader`], which reports a
//! [`DeliveryResult`]. [`EventShipper`] ties these together behind a
//! bounded queue and a background worker.

pub mod backoff;
pub mod batch;
pub mod builder;
pub mod clock;
pub mod envelope;
pub mod file_config;
pub mod handler;
pub mod rate_limited_warner;
pub mod record;
pub mod shipper;
pub mod thread_registry;
pub mod uploader;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use backoff::BackoffPolicy;
pub use batch::{BatchBuilder, BatchError};
pub use builder::{BackoffOverrides, BuildError, ShipperBuilder};
pub use clock::{TimestampAllocator, allocate};
pub use envelope::{Session, UploadEnvelope};
pub use file_config::{ConfigError, load_config_file};
pub use handler::{EmitError, EventSink};
pub use record::{Attributes, EventRecord, IncomingRecord};
pub use shipper::{EventShipper, ShipperConfig, UndeliveredBatch};
pub use thread_registry::{ThreadEntry, ThreadRegistry};
pub use uploader::{
    DeliveryResult, Transport, TransportError, TransportResponse, Uploader, UreqTransport,
};

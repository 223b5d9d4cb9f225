//! Background shipping of records to the ingestion endpoint.
//!
//! This module defines [`EventShipper`], the host-facing [`EventSink`]
//! implementation. Producers enqueue records onto a bounded channel; a
//! consumer thread owns the batch, renders envelopes and hands them to the
//! [`Uploader`](crate::uploader::Uploader).
//!
//! # Flush triggers
//!
//! - The batch holds `max_batch_events` events.
//! - The estimated payload reaches `max_batch_bytes`.
//! - `flush_interval` elapses since the previous flush.
//! - [`EventShipper::flush`] or shutdown.
//!
//! # Retry Semantics
//!
//! - **Delivered**: reset backoff state.
//! - **RetryableError**: sleep with jittered backoff and resend the same
//!   envelope until the backoff deadline passes.
//! - **ApplicationError / FatalError**: no retry.
//!
//! Envelopes given up on are sent to the overflow channel when configured.
//!
//! [`EventSink`]: crate::handler::EventSink

mod config;
mod handler;
mod worker;


pub use config::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_FLUSH_TIMEOUT, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_EVENTS,
    DEFAULT_WRITE_TIMEOUT, ShipperConfig, UndeliveredBatch,
};
pub use handler::EventShipper;

//! Worker thread driving batching and HTTP delivery.
//!
//! The worker owns the only [`BatchBuilder`] of its stream, so appends are
//! serialized by construction. Flushes happen when the batch reaches its
//! event or size limit, when the flush interval elapses, on request, and on
//! shutdown.

use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded,
};
use log::{debug, error, warn};

use crate::{
    backoff::BackoffState,
    batch::BatchBuilder,
    envelope::{Session, UploadEnvelope},
    handler::EmitError,
    rate_limited_warner::RateLimitedWarner,
    record::IncomingRecord,
    uploader::{DeliveryResult, Transport, Uploader},
};

use super::config::{ShipperConfig, UndeliveredBatch};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum ShipperCommand {
    Record(IncomingRecord),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Spawns the worker thread for `config`, delivering through `transport`.
pub fn spawn_worker<T>(
    config: ShipperConfig,
    session: Session,
    transport: T,
) -> (Sender<ShipperCommand>, thread::JoinHandle<()>)
where
    T: Transport + 'static,
{
    let (tx, rx) = bounded(config.capacity);
    let handle = thread::spawn(move || Worker::new(config, session, transport).run(rx));
    (tx, handle)
}

struct Worker<T> {
    batch: BatchBuilder,
    session: Session,
    uploader: Uploader<T>,
    backoff: BackoffState,
    warner: RateLimitedWarner,
    overflow: Option<Sender<UndeliveredBatch>>,
    max_batch_events: usize,
    max_batch_bytes: usize,
    flush_interval: Duration,
    last_flush: Instant,
}

impl<T: Transport> Worker<T> {
    fn new(config: ShipperConfig, session: Session, transport: T) -> Self {
        Self {
            batch: BatchBuilder::new(),
            session,
            uploader: Uploader::new(config.endpoint, transport),
            backoff: BackoffState::new(config.backoff),
            warner: RateLimitedWarner::new(config.warn_interval),
            overflow: config.overflow,
            max_batch_events: config.max_batch_events,
            max_batch_bytes: config.max_batch_bytes,
            flush_interval: config.flush_interval,
            last_flush: Instant::now(),
        }
    }

    fn run(mut self, rx: Receiver<ShipperCommand>) {
        loop {
            let wait = (self.last_flush + self.flush_interval)
                .saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(ShipperCommand::Record(record)) => self.handle_record(record),
                Ok(ShipperCommand::Flush(ack)) => {
                    self.flush_batch();
                    let _ = ack.send(());
                }
                Ok(ShipperCommand::Shutdown(ack)) => {
                    self.drain_pending(&rx);
                    self.flush_batch();
                    let _ = ack.send(());
                    break;
                }
                Err(RecvTimeoutError::Timeout) => self.flush_batch(),
                Err(RecvTimeoutError::Disconnected) => {
                    self.flush_batch();
                    break;
                }
            }
        }
        self.warner.flush(|count| {
            warn!("EventShipper dropped {count} events in the last interval");
        });
    }

    fn handle_record(&mut self, record: IncomingRecord) {
        if let Err(err) = self.batch.append_record(record) {
            // Only reachable if a render was not followed by a reset.
            error!("EventShipper could not append record: {err}");
            self.batch.reset();
            return;
        }
        // A queue that never runs dry keeps `recv_timeout` from timing out,
        // so the interval is also checked here.
        if self.batch.len() >= self.max_batch_events
            || self.batch.estimated_bytes() >= self.max_batch_bytes
            || self.flush_due(Instant::now())
        {
            self.flush_batch();
        }
    }

    fn flush_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) >= self.flush_interval
    }

    fn drain_pending(&mut self, rx: &Receiver<ShipperCommand>) {
        loop {
            match rx.try_recv() {
                Ok(ShipperCommand::Record(record)) => self.handle_record(record),
                Ok(ShipperCommand::Flush(ack)) | Ok(ShipperCommand::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn flush_batch(&mut self) {
        self.last_flush = Instant::now();
        if self.batch.is_empty() {
            return;
        }
        let rendered = self.batch.render(&self.session);
        self.batch.reset();
        match rendered {
            Ok(envelope) => self.deliver(envelope),
            Err(err) => error!("EventShipper could not render batch: {err}"),
        }
    }

    /// Deliver `envelope`, resending it unchanged while failures stay
    /// retryable and the backoff deadline has not passed.
    fn deliver(&mut self, envelope: UploadEnvelope) {
        loop {
            let now = Instant::now();
            let outcome = self.uploader.deliver(&envelope);
            match outcome {
                DeliveryResult::Delivered => {
                    self.backoff.record_success(now);
                    debug!(
                        "EventShipper delivered {} events to {}",
                        envelope.event_count(),
                        self.uploader.endpoint()
                    );
                    return;
                }
                DeliveryResult::RetryableError { .. } => {
                    warn!("EventShipper delivery failed: {outcome}");
                    match self.backoff.next_sleep(now) {
                        Some(delay) => thread::sleep(delay),
                        None => {
                            warn!("EventShipper exhausted retry deadline");
                            self.hand_off(envelope, outcome);
                            return;
                        }
                    }
                }
                DeliveryResult::ApplicationError { .. } => {
                    warn!("EventShipper envelope rejected: {outcome}");
                    self.hand_off(envelope, outcome);
                    return;
                }
                DeliveryResult::FatalError { .. } => {
                    error!("EventShipper delivery failed permanently: {outcome}");
                    self.hand_off(envelope, outcome);
                    return;
                }
            }
        }
    }

    fn hand_off(&self, envelope: UploadEnvelope, outcome: DeliveryResult) {
        let count = envelope.event_count() as u64;
        let Some(overflow) = &self.overflow else {
            self.warn_dropped(count);
            return;
        };
        match overflow.try_send(UndeliveredBatch { envelope, outcome }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.warn_dropped(count);
            }
        }
    }

    fn warn_dropped(&self, count: u64) {
        self.warner.record_drops(count);
        self.warner.warn_if_due(|dropped| {
            warn!("EventShipper dropped {dropped} undeliverable events");
        });
    }
}

/// Enqueues a record for the worker without blocking.
///
/// # Errors
///
/// * [`EmitError::QueueFull`] - the queue is at capacity; the record was dropped
/// * [`EmitError::Closed`] - the worker has shut down; the record was dropped
pub fn enqueue_record(
    tx: &Sender<ShipperCommand>,
    record: IncomingRecord,
    warner: &RateLimitedWarner,
) -> Result<(), EmitError> {
    match tx.try_send(ShipperCommand::Record(record)) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("EventShipper queue full; dropped {count} records");
            });
            Err(EmitError::QueueFull)
        }
        Err(TrySendError::Disconnected(_)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("EventShipper disconnected; dropped {count} records");
            });
            Err(EmitError::Closed)
        }
    }
}

/// Sends a flush command and waits for the worker to finish delivering.
///
/// The total wait, sending included, is bounded by `timeout`.
pub fn flush_queue(tx: &Sender<ShipperCommand>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(ShipperCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}

//! Public shipper type exported by the crate.

use std::{thread, time::Duration};

use parking_lot::Mutex;

use crate::{
    envelope::Session,
    handler::{EmitError, EventSink},
    rate_limited_warner::RateLimitedWarner,
    record::IncomingRecord,
    uploader::{Transport, UreqTransport},
};

use super::{
    config::ShipperConfig,
    worker::{ShipperCommand, enqueue_record, flush_queue, spawn_worker},
};

/// Ships records to the ingestion endpoint from a background worker.
///
/// `emit` never blocks on the network: records go onto a bounded queue and
/// the worker batches, renders and delivers them. Retryable failures are
/// retried with exponential backoff; envelopes that cannot be delivered are
/// handed to the configured overflow channel or reported as drops.
pub struct EventShipper {
    tx: Option<crossbeam_channel::Sender<ShipperCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    warner: RateLimitedWarner,
    session_id: String,
    flush_timeout: Duration,
}

impl EventShipper {
    /// Construct the shipper with the default `ureq` transport.
    pub fn with_config(config: ShipperConfig) -> Self {
        let transport = UreqTransport::new(
            config.connect_timeout,
            config.write_timeout,
            config.headers.clone(),
        );
        Self::with_transport(config, transport)
    }

    /// Construct the shipper delivering through `transport`.
    pub fn with_transport<T>(config: ShipperConfig, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        let session = Session::new(config.api_token.clone(), config.session_info.clone());
        let session_id = session.id().to_owned();
        let flush_timeout = config.flush_timeout;
        let warner = RateLimitedWarner::new(config.warn_interval);
        let (tx, handle) = spawn_worker(config, session, transport);
        Self {
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            warner,
            session_id,
            flush_timeout,
        }
    }

    /// Session id stamped on every envelope from this shipper.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Deliver everything queued so far.
    pub fn flush(&self) -> bool {
        <Self as EventSink>::flush(self)
    }

    /// Deliver pending records and wait for the worker to exit.
    pub fn close(&mut self) {
        self.request_shutdown();
        self.join_worker();
    }

    fn request_shutdown(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if tx.send(ShipperCommand::Shutdown(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv_timeout(self.flush_timeout);
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("EventShipper: worker thread panicked");
        }
    }
}

impl EventSink for EventShipper {
    fn emit(&self, record: IncomingRecord) -> Result<(), EmitError> {
        let Some(tx) = self.tx.as_ref() else {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                log::warn!("EventShipper dropped {count} records after shutdown");
            });
            return Err(EmitError::Closed);
        };
        enqueue_record(tx, record, &self.warner)
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.warner.flush(|count| {
            log::warn!("EventShipper dropped {count} records in the last interval");
        });
        flush_queue(tx, self.flush_timeout)
    }
}

impl Drop for EventShipper {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EventShipper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventShipper")
            .field("session_id", &self.session_id)
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}

//! Log output for misuse and undeliverable batches.
//!
//! `logtest` installs a process-wide logger, so this binary holds a single
//! test.

use femtoship::test_utils::{ScriptedReply, ScriptedTransport};
use femtoship::{BatchBuilder, BatchError, EventSink, IncomingRecord, Session, ShipperBuilder};
use femtoship::{Attributes, TimestampAllocator};
use log::Level;
use logtest::Logger;

fn drain(logger: &mut Logger) -> Vec<(Level, String)> {
    std::iter::from_fn(|| logger.pop())
        .map(|record| (record.level(), record.args().to_owned()))
        .collect()
}

#[test]
fn misuse_and_drops_are_logged() {
    let mut logger = Logger::start();

    let mut batch = BatchBuilder::with_allocator(Box::leak(Box::new(TimestampAllocator::new())));
    let session = Session::with_id("token", "session", Attributes::new());
    batch.render(&session).expect("render");
    assert_eq!(
        batch.append("tag", 1, Attributes::new()),
        Err(BatchError::Finalized)
    );
    let records = drain(&mut logger);
    assert!(
        records
            .iter()
            .any(|(level, msg)| *level == Level::Error && msg.contains("rendered batch")),
        "{records:?}"
    );

    let transport = ScriptedTransport::new([ScriptedReply::status(
        401,
        r#"{"status":"error/client/noPermission","message":"invalid token"}"#,
    )]);
    let mut shipper = ShipperBuilder::new()
        .with_api_token("token")
        .build_with_transport(transport.clone())
        .expect("shipper");
    shipper
        .emit(IncomingRecord::new("tag", 1, Attributes::new()))
        .expect("emit");
    assert!(shipper.flush());
    shipper.close();
    assert_eq!(transport.request_count(), 1);

    let records = drain(&mut logger);
    assert!(
        records.iter().any(|(level, msg)| *level == Level::Error
            && msg.contains("delivery failed permanently")
            && msg.contains("invalid token")),
        "{records:?}"
    );
    assert!(
        records
            .iter()
            .any(|(level, msg)| *level == Level::Warn && msg.contains("dropped 1 undeliverable")),
        "{records:?}"
    );
}

//! Loading shipper settings from files on disk.

use std::io::Write;
use std::time::Duration;

use femtoship::{ConfigError, load_config_file};
use rstest::rstest;
use serde_json::json;
use tempfile::NamedTempFile;

fn write_config(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write config");
    file.flush().expect("flush config");
    file
}

#[rstest]
fn loads_full_configuration() {
    let file = write_config(
        b"[shipper]\n\
          api_token = 0123abcd\n\
          endpoint = http://127.0.0.1:8080/addEvents\n\
          capacity = 64\n\
          max_batch_events = 10\n\
          max_batch_bytes = 4096\n\
          flush_interval_ms = 250\n\
          backoff_base_ms = 5\n\
          backoff_cap_ms = 50\n\
          backoff_deadline_ms = 1000\n\
          \n\
          [session_info]\n\
          serverHost = web-1\n\
          logfile = /var/log/app.log\n",
    );
    let config = load_config_file(file.path(), None)
        .expect("load")
        .build_config()
        .expect("valid config");

    assert_eq!(config.api_token, "0123abcd");
    assert_eq!(config.endpoint, "http://127.0.0.1:8080/addEvents");
    assert_eq!(config.capacity, 64);
    assert_eq!(config.max_batch_events, 10);
    assert_eq!(config.max_batch_bytes, 4096);
    assert_eq!(config.flush_interval, Duration::from_millis(250));
    assert_eq!(config.backoff.base, Duration::from_millis(5));
    assert_eq!(config.backoff.cap, Duration::from_millis(50));
    assert_eq!(config.backoff.deadline, Duration::from_millis(1000));
    assert_eq!(config.session_info.get("serverHost"), Some(&json!("web-1")));
    assert_eq!(
        config.session_info.get("logfile"),
        Some(&json!("/var/log/app.log"))
    );
}

#[rstest]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.ini");
    let err = load_config_file(&path, None).expect_err("missing file");
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(err.to_string().ends_with("doesn't exist"));
}

#[rstest]
fn honours_explicit_encoding() {
    let file = write_config(b"[shipper]\napi_token = abc\n[session_info]\ncity = M\xfcnchen\n");
    let config = load_config_file(file.path(), Some("latin1"))
        .expect("load")
        .build_config()
        .expect("valid config");
    assert_eq!(config.session_info.get("city"), Some(&json!("M\u{fc}nchen")));
}

#[rstest]
fn undecodable_bytes_are_rejected() {
    let file = write_config(b"[shipper]\napi_token = caf\xe9\n");
    let err = load_config_file(file.path(), None).expect_err("invalid utf-8");
    assert!(matches!(err, ConfigError::Decode { .. }));
}

#[rstest]
fn unknown_encoding_is_rejected() {
    let file = write_config(b"[shipper]\napi_token = abc\n");
    let err = load_config_file(file.path(), Some("klingon")).expect_err("bad label");
    assert!(matches!(err, ConfigError::UnknownEncoding(label) if label == "klingon"));
}

#[rstest]
fn missing_token_fails_at_build() {
    let file = write_config(b"[shipper]\nendpoint = https://example.com/addEvents\n");
    let builder = load_config_file(file.path(), None).expect("load");
    assert!(builder.build_config().is_err());
}

//! Loading shipper settings from INI files.
//!
//! ```ini
//! [shipper]
//! api_token = 0123abcd
//! endpoint = https://www.scalyr.com/addEvents
//! max_batch_events = 500
//! flush_interval_ms = 2000
//!
//! [session_info]
//! serverHost = web-1
//! ```
//!
//! Every `[shipper]` key except `api_token` is optional. Entries of the
//! `[session_info]` section become string-valued session metadata. Files
//! are decoded with `encoding_rs`, UTF-8 unless another label is given.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use encoding_rs::Encoding;
use ini::Ini;
use serde_json::Value;
use thiserror::Error;

use crate::builder::{BackoffOverrides, ShipperBuilder};

/// Section holding the shipper settings.
pub const SHIPPER_SECTION: &str = "shipper";
/// Section holding session metadata.
pub const SESSION_INFO_SECTION: &str = "session_info";

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} doesn't exist")]
    NotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown encoding {0}")]
    UnknownEncoding(String),
    #[error("{path} could not be decoded as {encoding}")]
    Decode { path: String, encoding: String },
    #[error("{path} is invalid: {message}")]
    Parse { path: String, message: String },
    #[error("{path} has no [shipper] section")]
    MissingSection { path: String },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("unknown key {0} in [shipper]")]
    UnknownKey(String),
}

/// Read `path` and return a builder populated from its settings.
///
/// `encoding` is an `encoding_rs` label such as `"utf-8"` or `"latin1"`.
pub fn load_config_file(
    path: impl AsRef<Path>,
    encoding: Option<&str>,
) -> Result<ShipperBuilder, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::NotFound(display.clone()),
        _ => ConfigError::Io {
            path: display.clone(),
            source,
        },
    })?;
    let text = decode(&display, &bytes, encoding.unwrap_or("utf-8"))?;
    parse_config(&display, &text)
}

/// Parse INI `text`; `origin` names the source in error messages.
pub fn parse_config(origin: &str, text: &str) -> Result<ShipperBuilder, ConfigError> {
    let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Parse {
        path: origin.to_owned(),
        message: err.to_string(),
    })?;
    let shipper = ini
        .section(Some(SHIPPER_SECTION))
        .ok_or_else(|| ConfigError::MissingSection {
            path: origin.to_owned(),
        })?;

    let mut builder = ShipperBuilder::new();
    let mut backoff = BackoffOverrides::new();
    for (key, value) in shipper.iter() {
        let value = value.trim();
        builder = match key {
            "api_token" => builder.with_api_token(value),
            "endpoint" => builder.with_endpoint(value),
            "capacity" => builder.with_capacity(parse_value(key, value)?),
            "max_batch_events" => builder.with_max_batch_events(parse_value(key, value)?),
            "max_batch_bytes" => builder.with_max_batch_bytes(parse_value(key, value)?),
            "flush_interval_ms" => builder.with_flush_interval_ms(parse_value(key, value)?),
            "connect_timeout_ms" => builder.with_connect_timeout_ms(parse_value(key, value)?),
            "write_timeout_ms" => builder.with_write_timeout_ms(parse_value(key, value)?),
            "flush_timeout_ms" => builder.with_flush_timeout_ms(parse_value(key, value)?),
            "backoff_base_ms" => {
                backoff = backoff.with_base_ms(parse_value(key, value)?);
                builder
            }
            "backoff_cap_ms" => {
                backoff = backoff.with_cap_ms(parse_value(key, value)?);
                builder
            }
            "backoff_reset_after_ms" => {
                backoff = backoff.with_reset_after_ms(parse_value(key, value)?);
                builder
            }
            "backoff_deadline_ms" => {
                backoff = backoff.with_deadline_ms(parse_value(key, value)?);
                builder
            }
            other => return Err(ConfigError::UnknownKey(other.to_owned())),
        };
    }
    builder = builder.with_backoff(backoff);

    if let Some(info) = ini.section(Some(SESSION_INFO_SECTION)) {
        for (key, value) in info.iter() {
            builder = builder.with_session_attribute(key, Value::String(value.to_owned()));
        }
    }
    Ok(builder)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn decode(path: &str, bytes: &[u8], label: &str) -> Result<String, ConfigError> {
    let normalized_label = label.trim().to_ascii_lowercase();
    let encoding = Encoding::for_label(normalized_label.as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(label.to_owned()))?;
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ConfigError::Decode {
            path: path.to_owned(),
            encoding: encoding.name().to_owned(),
        });
    }
    Ok(decoded.into_owned())
}

//! Builder for [`EventShipper`](crate::shipper::EventShipper).
//!
//! Exposes the token, endpoint, session metadata, batching thresholds,
//! timeouts and backoff parameters, validating them before a worker is
//! spawned.

use std::{collections::HashMap, time::Duration};

use crossbeam_channel::Sender;
use serde_json::Value;
use thiserror::Error;

use crate::backoff::BackoffPolicy;
use crate::record::Attributes;
use crate::shipper::{EventShipper, ShipperConfig, UndeliveredBatch};
use crate::uploader::Transport;

/// Errors that may occur while building a shipper.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid shipper configuration: {0}")]
    InvalidConfig(String),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Optional overrides for the redelivery backoff policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackoffOverrides {
    base_ms: Option<u64>,
    cap_ms: Option<u64>,
    reset_after_ms: Option<u64>,
    deadline_ms: Option<u64>,
}

impl BackoffOverrides {
    /// Create overrides with no custom values.
    pub fn new() -> Self {
        Self::default()
    }

    option_setter!(
        #[doc = "Override the base delay in milliseconds."]
        with_base_ms,
        base_ms,
        u64
    );
    option_setter!(
        #[doc = "Override the maximum delay in milliseconds."]
        with_cap_ms,
        cap_ms,
        u64
    );
    option_setter!(
        #[doc = "Override the healthy period that resets the delay."]
        with_reset_after_ms,
        reset_after_ms,
        u64
    );
    option_setter!(
        #[doc = "Override how long one envelope is retried before giving up."]
        with_deadline_ms,
        deadline_ms,
        u64
    );

    fn apply(&self, policy: &mut BackoffPolicy) -> Result<(), BuildError> {
        if let Some(base) = self.base_ms {
            policy.base = Duration::from_millis(ensure_positive!(base, "backoff_base_ms")?);
        }
        if let Some(cap) = self.cap_ms {
            policy.cap = Duration::from_millis(ensure_positive!(cap, "backoff_cap_ms")?);
        }
        if let Some(reset) = self.reset_after_ms {
            policy.reset_after =
                Duration::from_millis(ensure_positive!(reset, "backoff_reset_after_ms")?);
        }
        if let Some(deadline) = self.deadline_ms {
            policy.deadline =
                Duration::from_millis(ensure_positive!(deadline, "backoff_deadline_ms")?);
        }
        if policy.cap < policy.base {
            return Err(BuildError::InvalidConfig(
                "backoff_cap_ms must not be lower than backoff_base_ms".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing [`EventShipper`] instances.
#[derive(Clone, Debug, Default)]
pub struct ShipperBuilder {
    api_token: Option<String>,
    endpoint: Option<String>,
    session_info: Attributes,
    headers: HashMap<String, String>,
    capacity: Option<usize>,
    max_batch_events: Option<usize>,
    max_batch_bytes: Option<usize>,
    flush_interval_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    flush_timeout_ms: Option<u64>,
    backoff: BackoffOverrides,
    overflow: Option<Sender<UndeliveredBatch>>,
}

impl ShipperBuilder {
    /// Create a new builder with no token configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API token (required).
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Override the ingestion endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Replace the session metadata map.
    pub fn with_session_info(mut self, info: Attributes) -> Self {
        self.session_info = info;
        self
    }

    /// Add a single session metadata entry.
    pub fn with_session_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.session_info.insert(key.into(), value.into());
        self
    }

    /// Add a single custom HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    option_setter!(
        #[doc = "Set the bounded channel capacity."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(
        #[doc = "Set the event count that triggers a flush."]
        with_max_batch_events,
        max_batch_events,
        usize
    );
    option_setter!(
        #[doc = "Set the estimated payload size that triggers a flush."]
        with_max_batch_bytes,
        max_batch_bytes,
        usize
    );
    option_setter!(
        #[doc = "Set the flush interval in milliseconds."]
        with_flush_interval_ms,
        flush_interval_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the request timeout in milliseconds."]
        with_write_timeout_ms,
        write_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set how long flush and close wait for the worker, in milliseconds."]
        with_flush_timeout_ms,
        flush_timeout_ms,
        u64
    );

    /// Override backoff timings using the provided overrides.
    pub fn with_backoff(mut self, overrides: BackoffOverrides) -> Self {
        self.backoff = overrides;
        self
    }

    /// Send envelopes that could not be delivered to `overflow`.
    pub fn with_overflow(mut self, overflow: Sender<UndeliveredBatch>) -> Self {
        self.overflow = Some(overflow);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.validate_token()?;
        self.validate_endpoint()?;
        self.validate_sizes()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_token(&self) -> Result<(), BuildError> {
        match &self.api_token {
            None => Err(BuildError::InvalidConfig(
                "shipper requires an API token".into(),
            )),
            Some(token) if token.trim().is_empty() => Err(BuildError::InvalidConfig(
                "API token must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_endpoint(&self) -> Result<(), BuildError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Ok(())
        } else {
            Err(BuildError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got {endpoint:?}"
            )))
        }
    }

    fn validate_sizes(&self) -> Result<(), BuildError> {
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        if let Some(events) = self.max_batch_events {
            ensure_positive!(events, "max_batch_events")?;
        }
        if let Some(bytes) = self.max_batch_bytes {
            ensure_positive!(bytes, "max_batch_bytes")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), BuildError> {
        if let Some(interval) = self.flush_interval_ms {
            ensure_positive!(interval, "flush_interval_ms")?;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.write_timeout_ms {
            ensure_positive!(timeout, "write_timeout_ms")?;
        }
        if let Some(timeout) = self.flush_timeout_ms {
            ensure_positive!(timeout, "flush_timeout_ms")?;
        }
        Ok(())
    }

    /// Validate the settings and produce a [`ShipperConfig`].
    pub fn build_config(&self) -> Result<ShipperConfig, BuildError> {
        self.validate()?;

        let defaults = ShipperConfig::default();
        let millis = |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_millis);
        let mut config = ShipperConfig {
            api_token: self.api_token.clone().unwrap_or_default(),
            endpoint: self.endpoint.clone().unwrap_or(defaults.endpoint),
            session_info: self.session_info.clone(),
            headers: self.headers.clone(),
            capacity: self.capacity.unwrap_or(defaults.capacity),
            max_batch_events: self.max_batch_events.unwrap_or(defaults.max_batch_events),
            max_batch_bytes: self.max_batch_bytes.unwrap_or(defaults.max_batch_bytes),
            flush_interval: millis(self.flush_interval_ms, defaults.flush_interval),
            connect_timeout: millis(self.connect_timeout_ms, defaults.connect_timeout),
            write_timeout: millis(self.write_timeout_ms, defaults.write_timeout),
            flush_timeout: millis(self.flush_timeout_ms, defaults.flush_timeout),
            backoff: defaults.backoff,
            warn_interval: defaults.warn_interval,
            overflow: self.overflow.clone(),
        };

        self.backoff.apply(&mut config.backoff)?;
        Ok(config)
    }

    /// Build a shipper using the default HTTP transport.
    pub fn build(&self) -> Result<EventShipper, BuildError> {
        Ok(EventShipper::with_config(self.build_config()?))
    }

    /// Build a shipper delivering through `transport`.
    pub fn build_with_transport<T>(&self, transport: T) -> Result<EventShipper, BuildError>
    where
        T: Transport + 'static,
    {
        Ok(EventShipper::with_transport(self.build_config()?, transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use crate::shipper::DEFAULT_ENDPOINT;

    #[fixture]
    fn builder() -> ShipperBuilder {
        ShipperBuilder::new().with_api_token("token")
    }

    #[rstest]
    fn missing_token_is_rejected() {
        let err = ShipperBuilder::new().build_config().expect_err("no token");
        assert_eq!(
            err,
            BuildError::InvalidConfig("shipper requires an API token".into())
        );
    }

    #[rstest]
    fn blank_token_is_rejected() {
        let err = ShipperBuilder::new()
            .with_api_token("   ")
            .build_config()
            .expect_err("blank token");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[rstest]
    fn defaults_apply(builder: ShipperBuilder) {
        let config = builder.build_config().expect("config");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.session_info.is_empty());
        assert_eq!(config.backoff, BackoffPolicy::default());
    }

    #[rstest]
    #[case(ShipperBuilder::new().with_capacity(0), "capacity")]
    #[case(ShipperBuilder::new().with_max_batch_events(0), "max_batch_events")]
    #[case(ShipperBuilder::new().with_max_batch_bytes(0), "max_batch_bytes")]
    #[case(ShipperBuilder::new().with_flush_interval_ms(0), "flush_interval_ms")]
    #[case(ShipperBuilder::new().with_write_timeout_ms(0), "write_timeout_ms")]
    #[case(
        ShipperBuilder::new().with_backoff(BackoffOverrides::new().with_cap_ms(0)),
        "backoff_cap_ms"
    )]
    fn zero_values_are_rejected(#[case] builder: ShipperBuilder, #[case] field: &str) {
        let err = builder
            .with_api_token("token")
            .build_config()
            .expect_err("zero value");
        assert!(err.to_string().contains(field), "{err}");
    }

    #[rstest]
    fn non_http_endpoint_is_rejected(builder: ShipperBuilder) {
        let err = builder
            .with_endpoint("ftp://example.com")
            .build_config()
            .expect_err("bad endpoint");
        assert!(err.to_string().contains("http(s)"));
    }

    #[rstest]
    fn cap_below_base_is_rejected(builder: ShipperBuilder) {
        let err = builder
            .with_backoff(BackoffOverrides::new().with_base_ms(500).with_cap_ms(100))
            .build_config()
            .expect_err("cap below base");
        assert!(err.to_string().contains("backoff_cap_ms"));
    }

    #[rstest]
    fn overrides_are_applied(builder: ShipperBuilder) {
        let config = builder
            .with_endpoint("http://127.0.0.1:9/addEvents")
            .with_session_attribute("serverHost", "web-1")
            .with_header("User-Agent", "femtoship")
            .with_max_batch_events(10)
            .with_flush_interval_ms(250)
            .with_backoff(BackoffOverrides::new().with_base_ms(20).with_deadline_ms(1000))
            .build_config()
            .expect("config");
        assert_eq!(config.endpoint, "http://127.0.0.1:9/addEvents");
        assert_eq!(config.session_info.get("serverHost"), Some(&json!("web-1")));
        assert_eq!(config.headers.get("User-Agent").map(String::as_str), Some("femtoship"));
        assert_eq!(config.max_batch_events, 10);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.backoff.base, Duration::from_millis(20));
        assert_eq!(config.backoff.deadline, Duration::from_secs(1));
    }
}

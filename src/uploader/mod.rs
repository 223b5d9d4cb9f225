//! Single-shot delivery of upload envelopes.
//!
//! [`Uploader::deliver`] performs exactly one POST and classifies the
//! outcome. Retry scheduling is left to the caller:
//!
//! - **2xx + `{"status":"success"}`**: [`DeliveryResult::Delivered`].
//! - **2xx + any other body**: [`DeliveryResult::ApplicationError`].
//! - **429 / 5xx**: [`DeliveryResult::RetryableError`].
//! - **Other statuses**: [`DeliveryResult::FatalError`].
//! - **Network errors**: [`DeliveryResult::RetryableError`].

mod response;
mod transport;

use std::fmt;

use crate::envelope::UploadEnvelope;

pub use response::{IngestResponse, ResponseClass, classify_status};
pub use transport::{Transport, TransportError, TransportResponse, UreqTransport};

/// Outcome of one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The endpoint accepted the envelope.
    Delivered,
    /// The endpoint answered 2xx but rejected the payload.
    ApplicationError {
        /// Status field from the body, if it could be parsed.
        status: Option<String>,
        message: Option<String>,
    },
    /// Transient failure; the same envelope may be sent again.
    RetryableError {
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
        reason: String,
    },
    /// The request will not succeed without operator intervention.
    FatalError { status: Option<u16>, reason: String },
}

impl DeliveryResult {
    /// Whether the envelope was accepted.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Whether resending the unchanged envelope may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableError { .. })
    }
}

impl fmt::Display for DeliveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("delivered"),
            Self::ApplicationError { status, message } => write!(
                f,
                "rejected by endpoint (status {}): {}",
                status.as_deref().unwrap_or("<none>"),
                message.as_deref().unwrap_or("<no message>")
            ),
            Self::RetryableError {
                status: Some(code),
                reason,
            } => write!(f, "retryable HTTP {code}: {reason}"),
            Self::RetryableError { status: None, reason } => write!(f, "retryable: {reason}"),
            Self::FatalError {
                status: Some(code),
                reason,
            } => write!(f, "fatal HTTP {code}: {reason}"),
            Self::FatalError { status: None, reason } => write!(f, "fatal: {reason}"),
        }
    }
}

/// Sends envelopes to one ingestion endpoint.
#[derive(Debug)]
pub struct Uploader<T = UreqTransport> {
    endpoint: String,
    transport: T,
}

impl<T: Transport> Uploader<T> {
    /// Create an uploader posting to `endpoint` through `transport`.
    pub fn new(endpoint: impl Into<String>, transport: T) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Serialize `envelope`, POST it once and classify the outcome.
    pub fn deliver(&self, envelope: &UploadEnvelope) -> DeliveryResult {
        let body = match envelope.to_json() {
            Ok(body) => body,
            Err(err) => {
                return DeliveryResult::FatalError {
                    status: None,
                    reason: format!("failed to serialize envelope: {err}"),
                };
            }
        };
        match self.transport.post_json(&self.endpoint, &body) {
            Ok(response) => classify_response(&response),
            Err(err) => DeliveryResult::RetryableError {
                status: None,
                reason: err.to_string(),
            },
        }
    }
}

/// Combine the status class and the parsed body into a [`DeliveryResult`].
pub fn classify_response(response: &TransportResponse) -> DeliveryResult {
    let parsed = IngestResponse::parse(&response.body);
    match classify_status(response.status) {
        ResponseClass::Success => match parsed {
            Ok(body) if body.is_success() => DeliveryResult::Delivered,
            Ok(body) => DeliveryResult::ApplicationError {
                status: body.status,
                message: body.message,
            },
            Err(err) => DeliveryResult::ApplicationError {
                status: None,
                message: Some(format!("unparseable response body: {err}")),
            },
        },
        ResponseClass::Retryable => DeliveryResult::RetryableError {
            status: Some(response.status),
            reason: describe_failure(parsed.ok()),
        },
        ResponseClass::Permanent => DeliveryResult::FatalError {
            status: Some(response.status),
            reason: describe_failure(parsed.ok()),
        },
    }
}

fn describe_failure(body: Option<IngestResponse>) -> String {
    match body {
        Some(IngestResponse {
            message: Some(message),
            ..
        }) => message,
        Some(IngestResponse {
            status: Some(status),
            ..
        }) => status,
        _ => "no details in response body".to_owned(),
    }
}

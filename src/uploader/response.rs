//! Interpretation of ingestion endpoint responses.

use serde::Deserialize;

/// Body returned by the ingestion endpoint.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct IngestResponse {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl IngestResponse {
    /// Status value the endpoint uses for an accepted envelope.
    pub const SUCCESS: &'static str = "success";

    /// Parse a response body.
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Whether the endpoint reported the envelope as accepted.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(Self::SUCCESS)
    }
}

/// Classification of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx - the body decides the outcome.
    Success,
    /// 429 or 5xx - transient, retry the same envelope later.
    Retryable,
    /// Anything else - the request itself is wrong.
    Permanent,
}

/// Classifies an HTTP status code for retry logic.
///
/// * **2xx** → [`ResponseClass::Success`]
/// * **429** → [`ResponseClass::Retryable`] - rate limited
/// * **5xx** → [`ResponseClass::Retryable`] - server error
/// * **Other** → [`ResponseClass::Permanent`] - client error, do not retry
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        429 => ResponseClass::Retryable,
        500..=599 => ResponseClass::Retryable,
        _ => ResponseClass::Permanent,
    }
}

//! HTTP transport seam used by the uploader.
//!
//! [`UreqTransport`] is the production implementation. Tests substitute
//! their own [`Transport`] to script responses without network access.

use std::{collections::HashMap, io, sync::Arc, time::Duration};

use log::warn;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Construct a response from its parts.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures that prevented an HTTP exchange from completing.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("request failed: {0}")]
    Request(String),
    /// The response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] io::Error),
}

/// Performs a single JSON POST.
pub trait Transport: Send {
    /// POST `body` to `url` and return the response, including non-2xx ones.
    fn post_json(&self, url: &str, body: &str) -> Result<TransportResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post_json(&self, url: &str, body: &str) -> Result<TransportResponse, TransportError> {
        (**self).post_json(url, body)
    }
}

/// Transport backed by a pooled `ureq` agent using the platform TLS stack.
pub struct UreqTransport {
    agent: Agent,
    headers: HashMap<String, String>,
}

impl UreqTransport {
    /// Build an agent with the given timeouts and extra request headers.
    pub fn new(
        connect_timeout: Duration,
        write_timeout: Duration,
        headers: HashMap<String, String>,
    ) -> Self {
        let mut builder = AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout(write_timeout);
        match native_tls::TlsConnector::new() {
            Ok(connector) => builder = builder.tls_connector(Arc::new(connector)),
            Err(err) => warn!("UreqTransport falling back to default TLS connector: {err}"),
        }
        Self {
            agent: builder.build(),
            headers,
        }
    }
}

impl Transport for UreqTransport {
    fn post_json(&self, url: &str, body: &str) -> Result<TransportResponse, TransportError> {
        let mut request = self.agent.post(url);
        for (key, value) in &self.headers {
            request = request.set(key, value);
        }
        let response = match request
            .set("Content-Type", "application/json")
            .send_string(body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::Request(err.to_string()));
            }
        };
        let status = response.status();
        let body = response.into_string()?;
        Ok(TransportResponse { status, body })
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

//! Scripted [`Transport`] double for driving the uploader without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::uploader::{Transport, TransportError, TransportResponse};

/// Scripted reply for one request.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Respond(TransportResponse),
    /// Simulate a connection-level failure.
    Fail(String),
}

impl ScriptedReply {
    /// A 200 response with a success body.
    pub fn success() -> Self {
        Self::status(200, r#"{"status":"success"}"#)
    }

    /// A response with the given status and body.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Respond(TransportResponse::new(status, body))
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<(String, String)>,
}

/// [`Transport`] that records request bodies and replays scripted replies.
///
/// Once the script runs out every request succeeds. Clones share state, so a
/// clone kept by the test observes requests made through the original.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    /// Create a transport replaying `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                replies: replies.into_iter().collect(),
                requests: Vec::new(),
            })),
        }
    }

    /// Request bodies received so far.
    pub fn bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// URLs requested so far.
    pub fn urls(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

impl Transport for ScriptedTransport {
    fn post_json(&self, url: &str, body: &str) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock();
        state.requests.push((url.to_owned(), body.to_owned()));
        match state.replies.pop_front().unwrap_or_else(ScriptedReply::success) {
            ScriptedReply::Respond(response) => Ok(response),
            ScriptedReply::Fail(reason) => Err(TransportError::Request(reason)),
        }
    }
}

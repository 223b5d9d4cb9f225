//! Session identity and the upload envelope sent to the ingestion endpoint.

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::record::{Attributes, EventRecord};
use crate::thread_registry::ThreadEntry;

/// Identity shared by every envelope sent from one running process.
#[derive(Clone)]
pub struct Session {
    token: String,
    id: String,
    info: Option<Attributes>,
}

impl Session {
    /// Create a session with a freshly generated id.
    ///
    /// An empty `info` map is treated as "not configured".
    pub fn new(token: impl Into<String>, info: Attributes) -> Self {
        Self::with_id(token, Uuid::new_v4().to_string(), info)
    }

    /// Create a session with an explicit id.
    pub fn with_id(token: impl Into<String>, id: impl Into<String>, info: Attributes) -> Self {
        Self {
            token: token.into(),
            id: id.into(),
            info: (!info.is_empty()).then_some(info),
        }
    }

    /// API token sent with every envelope.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Session metadata, if any was configured.
    pub fn info(&self) -> Option<&Attributes> {
        self.info.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// The request body for one batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadEnvelope {
    pub token: String,
    pub session: String,
    /// Wall-clock seconds at construction, as a decimal string.
    pub client_timestamp: String,
    #[serde(rename = "sessionInfo", skip_serializing_if = "Option::is_none")]
    pub session_info: Option<Attributes>,
    pub events: Vec<EventRecord>,
    pub threads: Vec<ThreadEntry>,
}

impl UploadEnvelope {
    /// Assemble an envelope stamped with the current wall-clock time.
    pub fn new(session: &Session, events: Vec<EventRecord>, threads: Vec<ThreadEntry>) -> Self {
        Self {
            token: session.token.clone(),
            session: session.id.clone(),
            client_timestamp: Utc::now().timestamp().to_string(),
            session_info: session.info.clone(),
            events,
            threads,
        }
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Number of events carried.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn info(value: Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    #[rstest]
    fn empty_session_info_is_omitted() {
        let session = Session::with_id("tok", "sess", Attributes::new());
        let envelope = UploadEnvelope::new(&session, Vec::new(), Vec::new());
        let value: Value = serde_json::from_str(&envelope.to_json().expect("json")).expect("parse");
        let body = value.as_object().expect("object");
        assert!(!body.contains_key("sessionInfo"));
        assert_eq!(body["token"], "tok");
        assert_eq!(body["session"], "sess");
        assert_eq!(body["events"], json!([]));
        assert_eq!(body["threads"], json!([]));
    }

    #[rstest]
    fn configured_session_info_is_verbatim() {
        let session = Session::with_id("tok", "sess", info(json!({"serverHost": "web-1", "n": 2})));
        let envelope = UploadEnvelope::new(&session, Vec::new(), Vec::new());
        let value = serde_json::to_value(&envelope).expect("value");
        assert_eq!(value["sessionInfo"], json!({"serverHost": "web-1", "n": 2}));
    }

    #[rstest]
    fn client_timestamp_is_numeric_string() {
        let session = Session::with_id("tok", "sess", Attributes::new());
        let envelope = UploadEnvelope::new(&session, Vec::new(), Vec::new());
        assert!(envelope.client_timestamp.parse::<i64>().is_ok());
    }

    #[rstest]
    fn generated_session_ids_differ() {
        let a = Session::new("tok", Attributes::new());
        let b = Session::new("tok", Attributes::new());
        assert_ne!(a.id(), b.id());
    }

    #[rstest]
    fn debug_output_hides_token() {
        let session = Session::with_id("secret-token", "sess", Attributes::new());
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}

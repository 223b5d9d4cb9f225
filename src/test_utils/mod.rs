//! Test doubles shared by unit and integration tests.

mod mock_server;
mod scripted;

pub use mock_server::{CapturedRequest, closed_port, spawn_mock_server};
pub use scripted::{ScriptedReply, ScriptedTransport};

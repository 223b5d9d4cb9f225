#![allow(dead_code, unused_imports)]

pub mod fixtures;

pub use femtoship::test_utils::{CapturedRequest, closed_port, spawn_mock_server};
pub use fixtures::{attrs, fresh_batch, session, session_with_info};

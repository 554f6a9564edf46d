#![allow(dead_code)]

pub mod mock_server;
pub mod test_helpers;

pub use mock_server::{MockResponse, MockServer, RecordedRequest};
pub use test_helpers::*;

//! Protocol constants and the session result record

use serde::{Deserialize, Serialize};

pub const CLIENT_NAME: &str = "aie2e-client";

pub const RUN_TEST_SESSION_TOOL: &str = "run_test_session";

/// Final record returned by `run_test_session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSessionResult {
    pub passed: bool,
    pub run_time: f64,
    pub description: String,
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
}

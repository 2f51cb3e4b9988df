//! Test suite data model
//!
//! Test cases serialize verbatim into the `tests` argument of the
//! `run_test_session` tool call, so field names follow the wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::config::{SensitiveData, TransportConfig};

/// A deterministic step run before the natural-language task (e.g. navigation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAction {
    /// Action name understood by the executor, e.g. `go_to_url`
    #[serde(rename = "action", alias = "name")]
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl TestAction {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Shorthand for the common `go_to_url` setup action
    pub fn go_to_url(url: impl Into<String>) -> Self {
        let mut arguments = Map::new();
        arguments.insert("url".to_string(), Value::String(url.into()));
        Self::new("go_to_url", arguments)
    }
}

/// One natural-language task plus its acceptance criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub task: String,
    #[serde(default)]
    pub initial_actions: Vec<TestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_vision: Option<bool>,
}

/// An ordered group of test cases sharing one remote browser context
#[derive(Debug, Clone, PartialEq)]
pub struct TestSession {
    pub description: String,
    pub tests: Vec<TestCase>,
    pub allowed_domains: Option<Vec<String>>,
}

/// Everything one run executes, built once before connecting
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub sessions: Vec<TestSession>,
    pub allowed_domains: Option<Vec<String>>,
    /// Shared by every session of the suite, not scoped per session
    pub sensitive_data: Option<SensitiveData>,
    pub transport: TransportConfig,
    /// Per remote call timeout in milliseconds
    pub timeout: Option<u64>,
}

impl TestSuite {
    /// Number of test cases declared across all sessions
    pub fn total_tests(&self) -> usize {
        self.sessions.iter().map(|s| s.tests.len()).sum()
    }
}

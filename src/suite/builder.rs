//! Suite builder
//!
//! A `SuiteBuilder` is created once from the resolved configuration and
//! threaded through test-file loading. Sessions are only ever appended.

use crate::common::Config;

use super::model::{TestAction, TestCase, TestSession, TestSuite};

/// Per-session overrides
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Replaces the suite-level allowed domains for this session
    pub allowed_domains: Option<Vec<String>>,
}

/// Optional test case fields
#[derive(Debug, Clone, Default)]
pub struct CaseOptions {
    pub initial_actions: Vec<TestAction>,
    pub use_vision: Option<bool>,
}

impl CaseOptions {
    fn into_case(self, task: String) -> TestCase {
        TestCase {
            task,
            initial_actions: self.initial_actions,
            use_vision: self.use_vision,
        }
    }
}

/// Accumulates sessions into a single suite
#[derive(Debug)]
pub struct SuiteBuilder {
    suite: TestSuite,
}

impl SuiteBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            suite: TestSuite {
                sessions: Vec::new(),
                allowed_domains: config.allowed_domains.clone(),
                sensitive_data: config.sensitive_data.clone(),
                transport: config.transport.clone(),
                timeout: config.timeout,
            },
        }
    }

    /// Start a multi-case session; nothing is registered until `commit`
    pub fn test_session(
        &mut self,
        description: impl Into<String>,
        options: SessionOptions,
    ) -> SessionBuilder<'_> {
        let allowed_domains = options
            .allowed_domains
            .or_else(|| self.suite.allowed_domains.clone());
        SessionBuilder {
            session: TestSession {
                description: description.into(),
                tests: Vec::new(),
                allowed_domains,
            },
            builder: self,
        }
    }

    /// Register a standalone test case as its own single-case session
    pub fn test_case(&mut self, task: impl Into<String>, options: CaseOptions) -> &mut Self {
        let session = TestSession {
            description: String::new(),
            tests: vec![options.into_case(task.into())],
            allowed_domains: self.suite.allowed_domains.clone(),
        };
        self.add_session(session);
        self
    }

    pub fn add_session(&mut self, session: TestSession) {
        self.suite.sessions.push(session);
    }

    pub fn session_count(&self) -> usize {
        self.suite.sessions.len()
    }

    pub fn build(self) -> TestSuite {
        self.suite
    }
}

/// Chainable builder for one session
#[derive(Debug)]
pub struct SessionBuilder<'a> {
    builder: &'a mut SuiteBuilder,
    session: TestSession,
}

impl<'a> SessionBuilder<'a> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.session.description = description.into();
        self
    }

    pub fn test_case(mut self, task: impl Into<String>, options: CaseOptions) -> Self {
        self.session.tests.push(options.into_case(task.into()));
        self
    }

    /// Append the session to the suite
    pub fn commit(self) -> &'a mut SuiteBuilder {
        self.builder.add_session(self.session);
        self.builder
    }
}

//! Run controller
//!
//! Connects once, runs every session of the suite in order and folds the
//! per-session results into a suite verdict. A failing session is recorded
//! as entirely failed and the run moves on to the next one. Interrupts are
//! watched for the whole run, connect included, and teardown happens once.

pub mod reporter;
pub mod shutdown;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::mcp::{classify, extract_payload, ExecutorClient, NotificationHandler, TestSessionResult};
use crate::suite::{TestSession, TestSuite};

pub use reporter::{ConsoleReporter, Reporter, SilentReporter};

/// Anything able to connect to an executor and run sessions on it
#[async_trait]
pub trait SessionExecutor: Send {
    async fn connect(&mut self) -> Result<()>;

    async fn run_test_session(&mut self, session: &TestSession) -> Result<TestSessionResult>;

    /// Must be idempotent and never fail
    async fn disconnect(&mut self);
}

#[async_trait]
impl SessionExecutor for ExecutorClient {
    async fn connect(&mut self) -> Result<()> {
        ExecutorClient::connect(self).await
    }

    async fn run_test_session(&mut self, session: &TestSession) -> Result<TestSessionResult> {
        ExecutorClient::run_test_session(self, session).await
    }

    async fn disconnect(&mut self) {
        ExecutorClient::disconnect(self).await
    }
}

/// What one session contributed to the run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub description: String,
    pub passed: bool,
    /// Seconds
    pub run_time: f64,
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    /// Set when the remote call itself failed
    pub error: Option<String>,
}

impl SessionOutcome {
    /// A session the executor ran; totals count the declared test cases
    pub fn completed(session: &TestSession, result: TestSessionResult) -> Self {
        let declared = session.tests.len() as u64;
        if result.total_tests != declared {
            tracing::warn!(
                session = %session.description,
                declared,
                reported = result.total_tests,
                "Executor reported a different number of test cases"
            );
        }
        let passed_tests = result.passed_tests.min(declared);
        Self {
            description: session.description.clone(),
            passed: result.passed,
            run_time: result.run_time,
            total_tests: declared,
            passed_tests,
            failed_tests: declared - passed_tests,
            error: None,
        }
    }

    /// A session whose remote call failed: nothing passed, no time recorded
    pub fn failed(session: &TestSession, error: &Error) -> Self {
        let declared = session.tests.len() as u64;
        Self {
            description: session.description.clone(),
            passed: false,
            run_time: 0.0,
            total_tests: declared,
            passed_tests: 0,
            failed_tests: declared,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuiteVerdict {
    /// True only if every session passed
    pub passed: bool,
    pub run_time: f64,
    pub passed_tests: u64,
    pub total_tests: u64,
    pub sessions: Vec<SessionOutcome>,
}

impl Default for SuiteVerdict {
    fn default() -> Self {
        Self {
            passed: true,
            run_time: 0.0,
            passed_tests: 0,
            total_tests: 0,
            sessions: Vec::new(),
        }
    }
}

impl SuiteVerdict {
    pub fn failed_tests(&self) -> u64 {
        self.total_tests.saturating_sub(self.passed_tests)
    }

    fn record(&mut self, outcome: SessionOutcome) {
        self.passed &= outcome.passed;
        self.run_time += outcome.run_time;
        self.passed_tests += outcome.passed_tests;
        self.total_tests += outcome.total_tests;
        self.sessions.push(outcome);
    }
}

/// Run every session in order, isolating failures per session
pub async fn run_sessions<E>(executor: &mut E, suite: &TestSuite, reporter: &dyn Reporter) -> SuiteVerdict
where
    E: SessionExecutor + ?Sized,
{
    let mut verdict = SuiteVerdict::default();

    for session in &suite.sessions {
        reporter.session_started(session);
        let outcome = match executor.run_test_session(session).await {
            Ok(result) => SessionOutcome::completed(session, result),
            Err(e) => {
                tracing::warn!(session = %session.description, error = %e, "Test session failed");
                reporter.session_failed(session, &e);
                SessionOutcome::failed(session, &e)
            }
        };
        reporter.session_finished(&outcome);
        verdict.record(outcome);
    }

    verdict
}

/// Route executor log messages to the reporter as progress events
pub fn progress_handler(reporter: Arc<dyn Reporter>) -> NotificationHandler {
    Arc::new(move |data: &Value| {
        if let Some(payload) = extract_payload(data) {
            reporter.progress(&classify(payload));
        }
    })
}

/// Connect to the configured executor and run the whole suite
pub async fn run_suite(suite: TestSuite, reporter: Arc<dyn Reporter>) -> Result<SuiteVerdict> {
    let suite = Arc::new(suite);
    let handler = progress_handler(Arc::clone(&reporter));
    let mut client = ExecutorClient::new(Arc::clone(&suite), Some(handler));

    supervise(&mut client, &suite, reporter.as_ref(), shutdown::signal()).await
}

/// Connect, run every session and tear down exactly once
///
/// `shutdown` is raced against connecting and running alike; when it wins
/// the run fails with [`Error::Interrupted`] after the teardown.
pub async fn supervise<E, S>(
    executor: &mut E,
    suite: &TestSuite,
    reporter: &dyn Reporter,
    shutdown: S,
) -> Result<SuiteVerdict>
where
    E: SessionExecutor + ?Sized,
    S: Future<Output = &'static str>,
{
    tracing::debug!(
        sessions = suite.sessions.len(),
        tests = suite.total_tests(),
        transport = suite.transport.kind(),
        "Starting test suite"
    );
    reporter.suite_started(suite);

    let result = tokio::select! {
        result = async {
            executor.connect().await?;
            Ok::<_, Error>(run_sessions(&mut *executor, suite, reporter).await)
        } => result,
        signal = shutdown => Err(Error::Interrupted(signal)),
    };

    executor.disconnect().await;

    let verdict = result?;
    tracing::info!(
        passed = verdict.passed,
        passed_tests = verdict.passed_tests,
        total_tests = verdict.total_tests,
        "Test suite finished"
    );
    reporter.suite_finished(&verdict);
    Ok(verdict)
}

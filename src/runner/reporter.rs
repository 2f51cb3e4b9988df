//! Console reporting for test runs

use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::common::Error;
use crate::mcp::notification::{CaseInfo, CaseResult, SessionInfo, SessionSummary};
use crate::mcp::ProgressEvent;
use crate::suite::{TestSession, TestSuite};

use super::{SessionOutcome, SuiteVerdict};

const SEPARATOR: &str = "=========================================================================";
const INDENT: &str = "   ";

const SPINNER_FRAMES: &[&str] = &[
    "🌑 ", "🌒 ", "🌓 ", "🌔 ", "🌕 ", "🌖 ", "🌗 ", "🌘 ", "",
];
const SPINNER_INTERVAL: Duration = Duration::from_millis(80);
const SPINNER_TEXT: &str = "Running test case...";

/// Receives run lifecycle and progress events
///
/// `progress` is called from the protocol dispatcher while a session is in
/// flight, so implementations must be thread safe.
pub trait Reporter: Send + Sync {
    fn suite_started(&self, _suite: &TestSuite) {}
    fn session_started(&self, _session: &TestSession) {}
    fn progress(&self, _event: &ProgressEvent) {}
    fn session_failed(&self, _session: &TestSession, _error: &Error) {}
    fn session_finished(&self, _outcome: &SessionOutcome) {}
    fn suite_finished(&self, _verdict: &SuiteVerdict) {}
}

/// Discards everything
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Human readable output on stdout, warnings on stderr
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(&self) {
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner}{msg}") {
            pb.set_style(style.tick_strings(SPINNER_FRAMES));
        }
        pb.set_message(SPINNER_TEXT);
        pb.enable_steady_tick(SPINNER_INTERVAL);
        *slot = Some(pb);
    }

    fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Write to stderr without tearing the spinner line
    fn warn(&self, message: &str) {
        let slot = self.spinner.lock().ok();
        match slot.as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.suspend(|| eprintln!("{message}")),
            None => eprintln!("{message}"),
        }
    }
}

fn count(value: Option<u64>) -> String {
    value.map_or_else(|| "?".to_string(), |n| n.to_string())
}

fn seconds(value: Option<f64>) -> String {
    format!("{:.2}", value.unwrap_or(0.0))
}

fn status(passed: bool) -> String {
    if passed {
        format!("✅ {}", "PASSED".green())
    } else {
        format!("❌ {}", "FAILED".red())
    }
}

pub fn format_session_info(info: &SessionInfo) -> String {
    format!("📋 Starting test session with {} test(s)...", count(info.total_tests))
}

pub fn format_case_info(info: &CaseInfo) -> String {
    format!(
        "🔄 [{}/{}] {}",
        count(info.test_number),
        count(info.total_tests),
        info.task.as_deref().unwrap_or_default().bold()
    )
}

pub fn format_case_result(result: &CaseResult) -> String {
    let passed = result.passed.unwrap_or(false);
    let icon = if passed { "✅" } else { "❌" };
    let label = if passed {
        "PASSED".green()
    } else {
        "FAILED".red()
    };
    let mut out = format!(
        "{icon} [{}/{}] {label} ({}s)\n",
        count(result.test_number),
        count(result.total_tests),
        seconds(result.run_time)
    );

    if let Some(final_result) = &result.final_result {
        for line in final_result.lines().filter(|l| !l.trim().is_empty()) {
            out.push_str(&format!("{INDENT}{line}\n"));
        }
        out.push('\n');
    }

    if let Some(errors) = result.errors.as_ref().filter(|e| !e.is_empty()) {
        out.push_str(&format!("\n{INDENT}{}\n", "Errors:".red()));
        for (index, error) in errors.iter().enumerate() {
            if let Some(error) = error {
                out.push_str(&format!("{INDENT}{}. {error}\n", index + 1));
            }
        }
    }
    out
}

pub fn format_session_summary(summary: &SessionSummary) -> String {
    let icon = if summary.passed.unwrap_or(false) { "🎉" } else { "❌" };
    format!(
        "{icon} Session completed: {}/{} tests passed ({}s total)",
        count(summary.passed_tests),
        count(summary.total_tests),
        seconds(summary.run_time)
    )
}

pub fn format_session_outcome(outcome: &SessionOutcome) -> String {
    format!(
        "\n\n{SEPARATOR}\nTest session completed: {}\nResult: {}\nTests: {}/{} passed ({} failed)\nTotal run time: {:.2}s\n{SEPARATOR}",
        outcome.description,
        status(outcome.passed),
        outcome.passed_tests,
        outcome.total_tests,
        outcome.failed_tests,
        outcome.run_time
    )
}

pub fn format_verdict(verdict: &SuiteVerdict) -> String {
    let headline = if verdict.passed {
        format!("🎉 {}", "All tests passed!".green().bold())
    } else {
        format!("❌ {}", "Tests failed.".red().bold())
    };
    format!(
        "\n\n{SEPARATOR}\n{headline}\nTests: {}/{} passed ({} failed)\nTotal run time: {:.2}s\n{SEPARATOR}\n",
        verdict.passed_tests,
        verdict.total_tests,
        verdict.failed_tests(),
        verdict.run_time
    )
}

impl Reporter for ConsoleReporter {
    fn suite_started(&self, _suite: &TestSuite) {
        println!("AIE2E tests starting");
    }

    fn session_started(&self, session: &TestSession) {
        println!(
            "\n{SEPARATOR}\nTest session started: {}\n{SEPARATOR}",
            session.description.bold()
        );
    }

    fn progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SessionInfo(info) => println!("{}", format_session_info(info)),
            ProgressEvent::CaseInfo(info) => {
                println!("{}", format_case_info(info));
                self.start_spinner();
            }
            ProgressEvent::CaseResult(result) => {
                self.stop_spinner();
                print!("{}", format_case_result(result));
            }
            ProgressEvent::SessionResult(summary) => {
                self.stop_spinner();
                println!("{}", format_session_summary(summary));
            }
            ProgressEvent::Unknown(payload) => {
                self.warn(&format!(
                    "⚠️ {} Received unknown notification. Data: {payload}",
                    "Warning:".yellow()
                ));
            }
        }
    }

    fn session_failed(&self, _session: &TestSession, error: &Error) {
        self.stop_spinner();
        eprintln!("{} {error}", "Error running test session:".red());
    }

    fn session_finished(&self, outcome: &SessionOutcome) {
        self.stop_spinner();
        println!("{}", format_session_outcome(outcome));
    }

    fn suite_finished(&self, verdict: &SuiteVerdict) {
        self.stop_spinner();
        println!("{}", format_verdict(verdict));
    }
}

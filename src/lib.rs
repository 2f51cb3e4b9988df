//! aie2e - natural-language browser test runner
//!
//! Test sessions are declared in YAML, resolved against an `aie2e.toml`
//! configuration and executed by a remote executor reached over the Model
//! Context Protocol, either as a child process (stdio) or over HTTP.

pub mod cli;
pub mod common;
pub mod mcp;
pub mod runner;
pub mod suite;

// Re-export commonly used types for tests
pub use common::{Config, Error, Result};
pub use runner::{run_suite, SuiteVerdict};
pub use suite::{SuiteBuilder, TestSuite};

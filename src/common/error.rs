//! Error types for the aie2e test runner
//!
//! Configuration and connection errors are fatal for the whole run.
//! Remote tool errors, malformed results and timeouts are scoped to a
//! single test session and get caught by the run controller.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration file not found at: {path}")]
    ConfigNotFound { path: String },

    #[error("No aie2e configuration file found. Create aie2e.toml in your project root. Searched: {searched}")]
    NoConfigFound { searched: String },

    #[error("Configuration file {path} has invalid transport '{value}'. Valid transports: stdio, http")]
    InvalidTransport { path: String, value: String },

    #[error("Configuration file {path} has invalid llm_provider '{value}'. Valid providers: {valid}")]
    InvalidLlmProvider {
        path: String,
        value: String,
        valid: String,
    },

    #[error("Failed to load config file at {path}: {message}")]
    ConfigParse { path: String, message: String },

    // === Test Definition Errors ===
    #[error("Invalid test file '{path}': {message}")]
    TestFile { path: String, message: String },

    #[error("No test files found in \"{path}\"")]
    NoTestFiles { path: String },

    // === Transport / Connection Errors ===
    #[error("Invalid transport configuration: {0}")]
    TransportConstruction(String),

    #[error("Failed to connect to remote executor: {0}")]
    Connection(#[source] Box<Error>),

    #[error("Remote executor client not connected. Call connect() first")]
    NotConnected,

    #[error("Remote executor connection closed")]
    TransportClosed,

    // === Protocol Errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request '{method}' failed ({code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Request '{method}' timed out after {millis} ms")]
    Timeout { method: String, millis: u64 },

    // === Remote Tool Errors ===
    #[error("Remote tool call error: {0}")]
    RemoteTool(String),

    #[error("Unexpected tool result format. Tool result: {0}")]
    UnexpectedResultFormat(String),

    // === Run Errors ===
    #[error("Run interrupted by {0}")]
    Interrupted(&'static str),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an underlying failure as a connection error
    pub fn connection(cause: Error) -> Self {
        Self::Connection(Box::new(cause))
    }

    /// Create a config parse error for a file
    pub fn config_parse(path: &str, message: impl std::fmt::Display) -> Self {
        Self::ConfigParse {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a test file error
    pub fn test_file(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::TestFile {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

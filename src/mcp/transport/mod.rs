//! Where the remote executor lives and how to reach it
//!
//! [`create_transport`] validates the configuration and resolves it to an
//! [`Endpoint`] before any process is spawned or socket opened. The
//! protocol itself runs over rmcp's child-process and streamable HTTP
//! transports, built by the client at connect time.

#[cfg(test)]
pub(crate) mod scripted;

use std::fmt;
use url::Url;

use crate::common::config::{StdioTransportConfig, TransportConfig};
use crate::common::{Error, Result};

const API_KEY_FLAG: &str = "--api-key";
const REDACTED: &str = "****";

/// A validated way to reach the executor
#[derive(Clone, PartialEq)]
pub enum Endpoint {
    /// Spawn the executor and talk over its stdin/stdout
    Stdio { command: String, args: Vec<String> },
    /// Already running executor behind a streamable HTTP endpoint
    Http { url: Url },
}

impl Endpoint {
    /// Human readable description for logs
    ///
    /// The provider API key is masked.
    pub fn describe(&self) -> String {
        match self {
            Endpoint::Http { url } => url.to_string(),
            Endpoint::Stdio { command, args } => {
                let mut line = command.clone();
                let mut mask_next = false;
                for arg in args {
                    line.push(' ');
                    if mask_next {
                        line.push_str(REDACTED);
                        mask_next = false;
                    } else if arg.starts_with(&format!("{API_KEY_FLAG}=")) {
                        line.push_str(&format!("{API_KEY_FLAG}={REDACTED}"));
                    } else {
                        mask_next = arg == API_KEY_FLAG;
                        line.push_str(arg);
                    }
                }
                line
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::Stdio { .. } => "stdio",
            Endpoint::Http { .. } => "http",
        }
    }
}

// Debug output goes through `describe` so the key never reaches a log
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.describe())
    }
}

/// Resolve the transport selected by the configuration
pub fn create_transport(config: &TransportConfig) -> Result<Endpoint> {
    match config {
        TransportConfig::Http(http) => {
            if http.url.trim().is_empty() {
                return Err(Error::TransportConstruction(
                    "HTTP transport requires a URL to be specified".to_string(),
                ));
            }
            let url = Url::parse(&http.url).map_err(|e| {
                Error::TransportConstruction(format!("Invalid HTTP transport URL: {} ({})", http.url, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::TransportConstruction(format!(
                    "Invalid HTTP transport URL: {} (scheme must be http or https)",
                    http.url
                )));
            }
            Ok(Endpoint::Http { url })
        }
        TransportConfig::Stdio(stdio) => {
            if stdio.command.trim().is_empty() {
                return Err(Error::TransportConstruction(
                    "Stdio transport command cannot be empty".to_string(),
                ));
            }
            Ok(Endpoint::Stdio {
                command: stdio.command.clone(),
                args: stdio_args(stdio),
            })
        }
    }
}

/// Executor command line: base args, then model and provider, then the optional flags
pub fn stdio_args(config: &StdioTransportConfig) -> Vec<String> {
    let mut args = config.args.clone();
    args.push("--model".to_string());
    args.push(config.model.clone());
    args.push("--llm-provider".to_string());
    args.push(config.llm_provider.as_str().to_string());

    if let Some(api_key) = &config.api_key {
        args.push(API_KEY_FLAG.to_string());
        args.push(api_key.clone());
    }

    if config.headless {
        args.push("--headless".to_string());
    }

    args
}

//! Orchestration client for the remote test executor
//!
//! Owns the connection lifecycle and issues one `run_test_session` tool
//! call per test session. The protocol runs on rmcp: the running service
//! answers pings, and log notifications reach the registered handler
//! through [`ClientHandler::on_logging_message`].

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{
    CallToolRequestParams, ClientInfo, Implementation, LoggingMessageNotificationParam,
};
use rmcp::service::{NotificationContext, RunningService, ServiceError};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{IntoTransport, StreamableHttpClientTransport};
use rmcp::{serve_client, ClientHandler, RoleClient};
use serde_json::{json, Map, Value};
use tokio::process::Command;

use crate::common::{Error, Result};
use crate::suite::{TestSession, TestSuite};

use super::transport::{create_transport, Endpoint};
use super::types::{TestSessionResult, CLIENT_NAME, RUN_TEST_SESSION_TOOL};

/// Timeout for calls without a configured one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Receives the `data` of every log message notification
pub type NotificationHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Client-side protocol handler: forwards log messages to the handler
pub struct ProgressForwarder {
    handler: Option<NotificationHandler>,
}

impl ClientHandler for ProgressForwarder {
    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: Default::default(),
            client_info: Implementation {
                name: CLIENT_NAME.into(),
                title: Some("AIE2E test runner".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
        }
    }

    fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        if let Some(handler) = &self.handler {
            handler(&params.data);
        }
        std::future::ready(())
    }
}

pub struct ExecutorClient {
    suite: Arc<TestSuite>,
    handler: Option<NotificationHandler>,
    state: ConnectionState,
    /// Dropping or cancelling this closes the transport and stops the executor
    service: Option<RunningService<RoleClient, ProgressForwarder>>,
}

impl ExecutorClient {
    pub fn new(suite: Arc<TestSuite>, handler: Option<NotificationHandler>) -> Self {
        Self {
            suite,
            handler,
            state: ConnectionState::Unconnected,
            service: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reach the configured executor and perform the handshake
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        let endpoint = create_transport(&self.suite.transport).map_err(Error::connection)?;
        tracing::info!(executor = %endpoint.describe(), "Connecting to remote executor via {}", endpoint.kind());

        match endpoint {
            Endpoint::Stdio { command, args } => {
                let mut cmd = Command::new(&command);
                cmd.args(&args)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit())
                    .kill_on_drop(true);
                let transport = TokioChildProcess::new(cmd).map_err(|e| {
                    Error::connection(Error::TransportConstruction(format!(
                        "Failed to spawn executor '{command}': {e}"
                    )))
                })?;
                self.connect_with(transport).await
            }
            Endpoint::Http { url } => {
                let config = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                self.connect_with(StreamableHttpClientTransport::from_config(config))
                    .await
            }
        }
    }

    /// Perform the handshake over an already constructed transport
    pub async fn connect_with<T, E, A>(&mut self, transport: T) -> Result<()>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.state = ConnectionState::Connecting;
        let forwarder = ProgressForwarder {
            handler: self.handler.clone(),
        };

        match serve_client(forwarder, transport).await {
            Ok(service) => {
                match service.peer_info() {
                    Some(info) => tracing::info!(
                        server = %info.server_info.name,
                        version = %info.server_info.version,
                        "Connected to remote executor"
                    ),
                    None => tracing::info!("Connected to remote executor"),
                }
                self.service = Some(service);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Unconnected;
                Err(Error::connection(Error::Protocol(e.to_string())))
            }
        }
    }

    /// Run one test session remotely and return its result
    pub async fn run_test_session(&self, session: &TestSession) -> Result<TestSessionResult> {
        let service = match (&self.service, self.state) {
            (Some(service), ConnectionState::Connected) => service,
            _ => return Err(Error::NotConnected),
        };

        let mut arguments = Map::new();
        arguments.insert("description".to_string(), json!(session.description));
        arguments.insert("tests".to_string(), serde_json::to_value(&session.tests)?);
        if let Some(domains) = &session.allowed_domains {
            arguments.insert("allowed_domains".to_string(), json!(domains));
        }
        // Suite-wide: every session sees every secret
        if let Some(secrets) = &self.suite.sensitive_data {
            arguments.insert("sensitive_data".to_string(), serde_json::to_value(secrets)?);
        }

        let params = CallToolRequestParams {
            meta: None,
            name: RUN_TEST_SESSION_TOOL.into(),
            arguments: Some(arguments),
            task: None,
        };

        tracing::debug!(
            description = %session.description,
            tests = session.tests.len(),
            "Calling {}",
            RUN_TEST_SESSION_TOOL
        );
        let timeout = self.call_timeout();
        let result = tokio::time::timeout(timeout, service.peer().call_tool(params))
            .await
            .map_err(|_| Error::Timeout {
                method: "tools/call".to_string(),
                millis: timeout.as_millis() as u64,
            })?
            .map_err(|e| call_error("tools/call", e))?;

        parse_tool_result(serde_json::to_value(&result)?)
    }

    fn call_timeout(&self) -> Duration {
        match self.suite.timeout {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Stop the protocol service and release the transport
    ///
    /// Idempotent and infallible: problems while closing are logged.
    pub async fn disconnect(&mut self) {
        let Some(service) = self.service.take() else {
            self.state = ConnectionState::Unconnected;
            return;
        };
        self.state = ConnectionState::Disconnecting;

        match service.cancel().await {
            Ok(reason) => tracing::debug!(?reason, "Remote executor connection closed"),
            Err(e) => tracing::warn!(error = %e, "Error closing remote executor connection"),
        }
        self.state = ConnectionState::Unconnected;
    }
}

fn call_error(method: &str, error: ServiceError) -> Error {
    match error {
        ServiceError::McpError(e) => Error::Rpc {
            method: method.to_string(),
            code: i64::from(e.code.0),
            message: e.message.to_string(),
        },
        ServiceError::TransportClosed => Error::TransportClosed,
        other => Error::Protocol(other.to_string()),
    }
}

/// Decode a `tools/call` result into a session result
pub fn parse_tool_result(raw: Value) -> Result<TestSessionResult> {
    let content = raw
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let first_text = content
        .first()
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str);
    let is_error = raw.get("isError").and_then(Value::as_bool).unwrap_or(false);

    if is_error {
        let message = match first_text {
            Some(text) => text.to_string(),
            None => pretty(&Value::Array(content.clone())),
        };
        return Err(Error::RemoteTool(message));
    }

    let record = match first_text {
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
        None => raw
            .get("structuredContent")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Array(content.clone())),
    };

    if record.get("type").and_then(Value::as_str) == Some("test_session_result") {
        if let Ok(result) = serde_json::from_value(record) {
            return Ok(result);
        }
    }
    Err(Error::UnexpectedResultFormat(pretty(&raw)))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

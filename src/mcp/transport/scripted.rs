//! In-memory executor transport that answers from a script

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::service::RoleClient;
use rmcp::transport::Transport;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

type ToolScript = dyn Fn(&Value) -> Vec<Value> + Send + Sync;

/// How the scripted executor answers `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    Accept,
    Reject,
}

/// Answers `initialize` by itself and `tools/call` through a script
///
/// The script receives the tool arguments and returns the messages to emit,
/// typically some notifications followed by the final result. A returned
/// object with a `result` or `error` key but no `id` gets the request id.
pub struct ScriptedTransport {
    script: Arc<ToolScript>,
    handshake: Handshake,
    outbox: mpsc::UnboundedSender<ServerJsonRpcMessage>,
    inbox: Arc<AsyncMutex<mpsc::UnboundedReceiver<ServerJsonRpcMessage>>>,
    /// Every message the client sent, as JSON
    pub sent: Arc<Mutex<Vec<Value>>>,
    /// Incremented once when the transport is released
    pub released: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self {
            script: Arc::new(script),
            handshake: Handshake::Accept,
            outbox,
            inbox: Arc::new(AsyncMutex::new(inbox)),
            sent: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_handshake(mut self, handshake: Handshake) -> Self {
        self.handshake = handshake;
        self
    }

    fn replies(&self, message: &Value) -> Vec<Value> {
        let Some(id) = message.get("id").cloned() else {
            return Vec::new();
        };
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let mut replies = match (method, self.handshake) {
            ("initialize", Handshake::Accept) => vec![json!({
                "result": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": { "tools": {}, "logging": {} },
                    "serverInfo": { "name": "scripted", "version": "0.0.0" }
                }
            })],
            ("initialize", Handshake::Reject) => vec![json!({
                "error": { "code": -32603, "message": "executor misconfigured" }
            })],
            ("ping", _) => vec![json!({ "result": {} })],
            ("tools/call", _) => (self.script)(&message["params"]["arguments"]),
            _ => Vec::new(),
        };

        for reply in &mut replies {
            let is_reply = reply.get("result").is_some() || reply.get("error").is_some();
            if is_reply && reply.get("id").is_none() {
                reply["id"] = id.clone();
            }
            reply["jsonrpc"] = json!("2.0");
        }
        replies
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A `notifications/message` carrying `msg` as its progress payload
pub fn log_notification(msg: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "notifications/message",
        "params": { "level": "info", "logger": "aie2e", "data": { "msg": msg } }
    })
}

/// A successful `tools/call` reply whose text content is `record`
pub fn tool_text_result(record: &Value) -> Value {
    json!({
        "result": {
            "content": [{ "type": "text", "text": record.to_string() }],
            "isError": false
        }
    })
}

impl Transport<RoleClient> for ScriptedTransport {
    type Error = Infallible;

    fn send(
        &mut self,
        item: ClientJsonRpcMessage,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send + 'static {
        let message = serde_json::to_value(&item).expect("client message serializes");
        self.sent.lock().unwrap().push(message.clone());

        for reply in self.replies(&message) {
            let reply: ServerJsonRpcMessage =
                serde_json::from_value(reply).expect("scripted reply is a valid server message");
            let _ = self.outbox.send(reply);
        }
        std::future::ready(Ok(()))
    }

    fn receive(&mut self) -> impl std::future::Future<Output = Option<ServerJsonRpcMessage>> + Send {
        let inbox = Arc::clone(&self.inbox);
        async move { inbox.lock().await.recv().await }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

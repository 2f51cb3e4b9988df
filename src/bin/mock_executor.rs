//! Mock remote executor for integration testing
//!
//! Speaks the stdio flavour of the tool-invocation protocol: one JSON-RPC
//! message per line. `run_test_session` "runs" each case instantly and
//! streams the same progress notifications a real executor would.
//!
//! Markers in a task's text change the outcome:
//! - `[fail]`: the case fails
//! - `[error]`: the whole call returns an error result
//! - `[garbage]`: the call returns text that is not a session result
//! - `[hang]`: the call is answered only after two seconds
//!
//! Flags: `--fail-initialize` rejects the handshake, `--record <file>`
//! appends the command line and every tool call's arguments to `file`.
//! Anything else on the command line (model, provider...) is ignored.

use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut state = MockState {
        fail_initialize: argv.iter().any(|a| a == "--fail-initialize"),
        record: argv
            .iter()
            .position(|a| a == "--record")
            .and_then(|i| argv.get(i + 1))
            .map(PathBuf::from),
    };
    state.record_line(&json!({ "argv": argv }));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let message: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        for response in state.process_message(&message) {
            send_message(&mut writer, &response);
        }
    }
}

fn send_message<W: Write>(writer: &mut W, message: &Value) {
    let line = serde_json::to_string(message).unwrap();
    writer.write_all(line.as_bytes()).ok();
    writer.write_all(b"\n").ok();
    writer.flush().ok();
}

fn log(msg: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "notifications/message",
        "params": { "level": "info", "logger": "aie2e", "data": { "msg": msg } }
    })
}

fn reply(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn text_result(text: String, is_error: bool) -> Value {
    json!({ "content": [{ "type": "text", "text": text }], "isError": is_error })
}

struct MockState {
    fail_initialize: bool,
    record: Option<PathBuf>,
}

impl MockState {
    fn record_line(&self, value: &Value) {
        if let Some(path) = &self.record {
            let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
            writeln!(file, "{value}").unwrap();
        }
    }

    fn process_message(&mut self, message: &Value) -> Vec<Value> {
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let Some(id) = message.get("id").cloned() else {
            // Notifications (initialized, cancelled) need no answer
            return Vec::new();
        };

        match method {
            "initialize" if self.fail_initialize => vec![json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32603, "message": "mock executor refused to initialize" }
            })],
            "initialize" => vec![reply(
                &id,
                json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": { "tools": {}, "logging": {} },
                    "serverInfo": { "name": "mock-executor", "version": "0.0.1" }
                }),
            )],
            "ping" => vec![reply(&id, json!({}))],
            "tools/list" => vec![reply(
                &id,
                json!({ "tools": [{ "name": "run_test_session", "inputSchema": { "type": "object" } }] }),
            )],
            "tools/call" => self.run_test_session(&id, &message["params"]),
            _ => vec![json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {method}") }
            })],
        }
    }

    fn run_test_session(&mut self, id: &Value, params: &Value) -> Vec<Value> {
        if params["name"] != "run_test_session" {
            return vec![reply(id, text_result(format!("Unknown tool: {}", params["name"]), true))];
        }
        let arguments = &params["arguments"];
        self.record_line(arguments);

        let description = arguments["description"].as_str().unwrap_or("").to_string();
        let tests = arguments["tests"].as_array().cloned().unwrap_or_default();
        let total = tests.len();
        let tasks: Vec<String> = tests
            .iter()
            .map(|t| t["task"].as_str().unwrap_or("").to_string())
            .collect();

        let mut out = vec![
            log(json!({ "type": "test_session_info", "description": description, "total_tests": total })),
            log(json!("browser context ready")),
        ];

        if tasks.iter().any(|t| t.contains("[error]")) {
            out.push(reply(id, text_result("Executor failed: forced error".to_string(), true)));
            return out;
        }
        if tasks.iter().any(|t| t.contains("[garbage]")) {
            out.push(reply(id, text_result("session finished, probably".to_string(), false)));
            return out;
        }
        if tasks.iter().any(|t| t.contains("[hang]")) {
            std::thread::sleep(Duration::from_secs(2));
        }

        let mut passed_tests = 0;
        for (index, task) in tasks.iter().enumerate() {
            let number = index + 1;
            out.push(log(Value::String(
                json!({
                    "type": "test_case_info",
                    "session_description": description,
                    "task": task,
                    "test_number": number,
                    "total_tests": total
                })
                .to_string(),
            )));

            let passed = !task.contains("[fail]");
            if passed {
                passed_tests += 1;
            }
            let (final_result, errors) = if passed {
                ("Task completed", Vec::new())
            } else {
                (
                    "Expected element not found",
                    vec![Value::Null, json!("assertion failed in mock executor")],
                )
            };
            out.push(log(Value::String(
                json!({
                    "type": "test_case_result",
                    "passed": passed,
                    "run_time": 1.25,
                    "final_result": final_result,
                    "errors": errors,
                    "test_number": number,
                    "total_tests": total
                })
                .to_string(),
            )));
        }

        let record = json!({
            "type": "test_session_result",
            "passed": passed_tests == total,
            "run_time": 1.25 * total as f64,
            "description": description,
            "total_tests": total,
            "passed_tests": passed_tests,
            "failed_tests": total - passed_tests
        });
        out.push(log(record.clone()));
        out.push(reply(id, text_result(record.to_string(), false)));
        out
    }
}

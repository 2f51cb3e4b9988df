//! Progress notification classifier
//!
//! The executor reports progress through `notifications/message` log
//! messages whose `data.msg` holds a typed record, often as a JSON string
//! inside the JSON. Classification never fails. The `type` field alone
//! picks the record; fields that are missing or wrongly typed are left
//! unset. Anything without a known `type` becomes [`ProgressEvent::Unknown`].
//!
//! A `test_session_result` notification may repeat (or disagree with) the
//! direct reply to the tool call. The reply is authoritative; these events
//! only drive live progress output.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// `test_session_info`: a session is starting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    pub description: Option<String>,
    pub total_tests: Option<u64>,
}

/// `test_case_info`: a test case is starting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseInfo {
    pub session_description: Option<String>,
    pub task: Option<String>,
    pub test_number: Option<u64>,
    pub total_tests: Option<u64>,
}

/// `test_case_result`: a test case finished
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseResult {
    pub passed: Option<bool>,
    pub run_time: Option<f64>,
    pub final_result: Option<String>,
    /// Non-string entries become `None`
    pub errors: Option<Vec<Option<String>>>,
    pub test_number: Option<u64>,
    pub total_tests: Option<u64>,
}

/// `test_session_result`: a session finished
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub passed: Option<bool>,
    pub run_time: Option<f64>,
    pub description: Option<String>,
    pub total_tests: Option<u64>,
    pub passed_tests: Option<u64>,
    pub failed_tests: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    SessionInfo(SessionInfo),
    CaseInfo(CaseInfo),
    CaseResult(CaseResult),
    SessionResult(SessionSummary),
    /// Unrecognized payload, as decoded
    Unknown(Value),
}

/// Pull the progress payload out of a log message's `data`
pub fn extract_payload(data: &Value) -> Option<&Value> {
    data.get("msg").filter(|msg| !msg.is_null())
}

/// Classify a progress payload
pub fn classify(payload: &Value) -> ProgressEvent {
    let decoded: Cow<'_, Value> = match payload {
        Value::String(text) => serde_json::from_str(text)
            .map(Cow::Owned)
            .unwrap_or(Cow::Borrowed(payload)),
        other => Cow::Borrowed(other),
    };
    let record = decoded.as_ref();

    match record.get("type").and_then(Value::as_str) {
        Some("test_session_info") => ProgressEvent::SessionInfo(SessionInfo {
            description: field(record, "description"),
            total_tests: field(record, "total_tests"),
        }),
        Some("test_case_info") => ProgressEvent::CaseInfo(CaseInfo {
            session_description: field(record, "session_description"),
            task: field(record, "task"),
            test_number: field(record, "test_number"),
            total_tests: field(record, "total_tests"),
        }),
        Some("test_case_result") => ProgressEvent::CaseResult(CaseResult {
            passed: field(record, "passed"),
            run_time: field(record, "run_time"),
            final_result: field(record, "final_result"),
            errors: record.get("errors").and_then(Value::as_array).map(|errors| {
                errors
                    .iter()
                    .map(|e| e.as_str().map(str::to_string))
                    .collect()
            }),
            test_number: field(record, "test_number"),
            total_tests: field(record, "total_tests"),
        }),
        Some("test_session_result") => ProgressEvent::SessionResult(SessionSummary {
            passed: field(record, "passed"),
            run_time: field(record, "run_time"),
            description: field(record, "description"),
            total_tests: field(record, "total_tests"),
            passed_tests: field(record, "passed_tests"),
            failed_tests: field(record, "failed_tests"),
        }),
        _ => ProgressEvent::Unknown(decoded.into_owned()),
    }
}

/// One field of a record, `None` when absent or of the wrong type
fn field<T: DeserializeOwned>(record: &Value, key: &str) -> Option<T> {
    record.get(key).and_then(|value| T::deserialize(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_types() {
        let event = classify(&json!({ "type": "test_session_info", "description": "Form", "total_tests": 2 }));
        assert_eq!(
            event,
            ProgressEvent::SessionInfo(SessionInfo {
                description: Some("Form".to_string()),
                total_tests: Some(2),
            })
        );

        let event = classify(&json!({
            "type": "test_case_info",
            "session_description": "Form",
            "task": "Fill the form",
            "test_number": 1,
            "total_tests": 2
        }));
        assert!(matches!(event, ProgressEvent::CaseInfo(ref info) if info.task.as_deref() == Some("Fill the form")));

        let event = classify(&json!({
            "type": "test_case_result",
            "passed": false,
            "run_time": 4.5,
            "final_result": "Submit button missing",
            "errors": [null, "timeout clicking submit"],
            "test_number": 1,
            "total_tests": 2
        }));
        let ProgressEvent::CaseResult(result) = event else {
            panic!("expected case result");
        };
        assert_eq!(result.passed, Some(false));
        assert_eq!(result.errors, Some(vec![None, Some("timeout clicking submit".to_string())]));

        let event = classify(&json!({
            "type": "test_session_result",
            "passed": true,
            "run_time": 12.3,
            "description": "Form",
            "total_tests": 1,
            "passed_tests": 1,
            "failed_tests": 0
        }));
        assert!(matches!(event, ProgressEvent::SessionResult(ref s) if s.passed_tests == Some(1)));
    }

    #[test]
    fn test_string_and_object_payloads_classify_identically() {
        let object = json!({ "type": "test_case_info", "task": "t", "test_number": 1, "total_tests": 1 });
        let string = Value::String(object.to_string());
        assert_eq!(classify(&object), classify(&string));

        let unknown = json!({ "status": "browser started" });
        assert_eq!(classify(&unknown), classify(&Value::String(unknown.to_string())));
    }

    #[test]
    fn test_partial_known_record_keeps_absent_fields() {
        let event = classify(&json!({ "type": "test_case_result", "passed": true }));
        assert_eq!(
            event,
            ProgressEvent::CaseResult(CaseResult {
                passed: Some(true),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_unrecognized_payloads() {
        assert_eq!(
            classify(&json!("plain log line")),
            ProgressEvent::Unknown(json!("plain log line"))
        );
        assert!(matches!(classify(&json!({ "type": "screenshot" })), ProgressEvent::Unknown(_)));
        assert!(matches!(classify(&json!(42)), ProgressEvent::Unknown(_)));
    }

    #[test]
    fn test_wrongly_typed_fields_keep_the_record_type() {
        let event = classify(&json!({
            "type": "test_case_result",
            "passed": true,
            "run_time": "fast",
            "final_result": "Done",
            "errors": ["boom", { "detail": "x" }],
            "test_number": 2
        }));
        assert_eq!(
            event,
            ProgressEvent::CaseResult(CaseResult {
                passed: Some(true),
                run_time: None,
                final_result: Some("Done".to_string()),
                errors: Some(vec![Some("boom".to_string()), None]),
                test_number: Some(2),
                total_tests: None,
            })
        );

        let event = classify(&json!({ "type": "test_session_info", "total_tests": "two" }));
        assert_eq!(event, ProgressEvent::SessionInfo(SessionInfo::default()));

        let event = classify(&json!({ "type": "test_session_result", "passed": "yes", "passed_tests": 1 }));
        assert!(matches!(
            event,
            ProgressEvent::SessionResult(ref s) if s.passed.is_none() && s.passed_tests == Some(1)
        ));
    }

    #[test]
    fn test_extract_payload() {
        let data = json!({ "msg": "{\"type\":\"test_session_info\"}" });
        assert_eq!(
            extract_payload(&data),
            Some(&json!("{\"type\":\"test_session_info\"}"))
        );

        assert_eq!(extract_payload(&json!("hello")), None);
        assert_eq!(extract_payload(&json!({ "msg": null })), None);
    }
}

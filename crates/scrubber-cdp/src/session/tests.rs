use super::core::PageSession;
use crate::protocol::{ESCAPE, KeyEventType};
use serde_json::json;

#[test]
fn test_escape_key_event() {
    let event = PageSession::key_event(KeyEventType::RawKeyDown, ESCAPE);
    assert_eq!(event["type"], "rawKeyDown");
    assert_eq!(event["key"], "Escape");
    assert_eq!(event["code"], "Escape");
    assert_eq!(event["windowsVirtualKeyCode"], 27);
}

#[test]
fn test_evaluation_value() {
    let result = json!({"result": {"type": "string", "value": "complete"}});
    assert_eq!(PageSession::evaluation_value(result).unwrap(), "complete");

    let result = json!({"result": {"type": "undefined"}});
    assert!(PageSession::evaluation_value(result).unwrap().is_null());
}

#[test]
fn test_evaluation_exception() {
    let result = json!({
        "result": {"type": "object"},
        "exceptionDetails": {
            "text": "Uncaught",
            "exception": {"description": "TypeError: x is undefined"}
        }
    });
    let err = PageSession::evaluation_value(result).unwrap_err();
    assert_eq!(err.to_string(), "JavaScript error: TypeError: x is undefined");

    let result = json!({"exceptionDetails": {"text": "Uncaught"}});
    let err = PageSession::evaluation_value(result).unwrap_err();
    assert_eq!(err.to_string(), "JavaScript error: Uncaught");
}

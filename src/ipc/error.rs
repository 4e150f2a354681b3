use crate::error::EngineError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Error envelope for an engine failure; the code comes from the variant.
pub fn engine_err(id: &str, e: &EngineError) -> serde_json::Value {
    if e.is_retryable() {
        tracing::warn!(request = id, error = %e, "storage busy, caller may retry");
    } else if matches!(e, EngineError::Storage(_)) {
        tracing::warn!(request = id, error = %e, "storage failure");
    }
    err(id, e.code(), e.to_string(), e.details())
}

pub fn event(id: &str, event: &str, data: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "event": event,
        "data": data,
    })
}

//! Backend response envelopes.
//!
//! The backend wraps payloads as `{"data": ...}`; successes carry the record
//! and failures carry `{"err": "..."}` (or a list of messages). Unwrapping is
//! applied to every response body regardless of endpoint.

use serde_json::Value;

/// Replace an envelope with its `data` field. Bodies that are not objects,
/// or objects without a `data` key, pass through unchanged.
#[must_use]
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Parse raw response bytes, treating an empty body as `null`.
///
/// # Errors
///
/// Returns the JSON error for a non-empty body that is not valid JSON.
pub fn parse_body(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
}

/// Extract the backend's error message from an (unwrapped) failure body.
///
/// Accepts `{"err": "msg"}`, `{"err": ["a", "b"]}`, `{"msg": "..."}`, or a
/// bare string.
#[must_use]
pub fn error_message(body: &Value) -> Option<String> {
    let field = match body {
        Value::String(s) => return non_empty(s),
        Value::Object(map) => map.get("err").or_else(|| map.get("msg"))?,
        _ => return None,
    };
    match field {
        Value::String(s) => non_empty(s),
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            non_empty(&joined)
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unwrap_nested_data() {
        let body = json!({"data": {"msg": "ok"}});
        assert_eq!(unwrap_envelope(body), json!({"msg": "ok"}));
    }

    #[test]
    fn test_unwrap_passes_through_without_data() {
        let body = json!({"msg": "ok"});
        assert_eq!(unwrap_envelope(body.clone()), body);
        assert_eq!(unwrap_envelope(json!([1, 2])), json!([1, 2]));
        assert_eq!(unwrap_envelope(json!("pong")), json!("pong"));
    }

    #[test]
    fn test_unwrap_only_one_level() {
        let body = json!({"data": {"data": 1}});
        assert_eq!(unwrap_envelope(body), json!({"data": 1}));
    }

    #[test]
    fn test_unwrap_null_data() {
        assert_eq!(unwrap_envelope(json!({"data": null})), Value::Null);
    }

    #[test]
    fn test_parse_body_empty() {
        assert_eq!(parse_body(b"").ok(), Some(Value::Null));
        assert_eq!(parse_body(b" \n").ok(), Some(Value::Null));
        assert!(parse_body(b"<html>").is_err());
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(&json!({"err": "bad input"})).as_deref(), Some("bad input"));
        assert_eq!(
            error_message(&json!({"err": ["email required", "name required"]})).as_deref(),
            Some("email required; name required")
        );
        assert_eq!(error_message(&json!({"msg": "nope"})).as_deref(), Some("nope"));
        assert_eq!(error_message(&json!("plain")).as_deref(), Some("plain"));
        assert_eq!(error_message(&json!({"err": ""})), None);
        assert_eq!(error_message(&json!(42)), None);
    }
}

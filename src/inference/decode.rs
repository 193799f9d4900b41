//! Lenient extraction of text from inference responses.
//!
//! Hosted text endpoints disagree on their response envelope: generation
//! models return `[{"generated_text": …}]` or `{"generated_text": …}`,
//! speech recognition returns `{"text": …}`, visual question answering
//! returns `[{"answer": …, "score": …}]`, and some gateways return a bare
//! string. [`extract_text`] accepts all of them; a shape it does not
//! recognise degrades to the stringified JSON value instead of failing, so
//! an unexpected schema never turns a successful call into an error.

use serde_json::Value;

/// Fields checked, in order, when the response is a JSON object.
const TEXT_FIELDS: [&str; 3] = ["generated_text", "text", "answer"];

/// Pull the most plausible text payload out of `value`.
///
/// * Bare string → the string itself.
/// * Non-empty array → recurse into the first element.
/// * Object → the first of `generated_text` / `text` / `answer` that holds
///   a string.
/// * Anything else → `value.to_string()` (best-effort fallback).
///
/// The result is trimmed.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use voice_assistant::inference::extract_text;
///
/// assert_eq!(extract_text(&json!([{"generated_text": "hi"}])), "hi");
/// assert_eq!(extract_text(&json!({"generated_text": "hi"})), "hi");
/// ```
pub fn extract_text(value: &Value) -> String {
    extract(value).trim().to_string()
}

fn extract(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) if !items.is_empty() => extract(&items[0]),
        Value::Object(map) => {
            for field in TEXT_FIELDS {
                if let Some(Value::String(s)) = map.get(field) {
                    return s.clone();
                }
            }
            value.to_string()
        }
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

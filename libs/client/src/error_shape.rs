//! Turning a backend error body into one human readable message.
//!
//! The backend follows the usual django rest framework conventions. A body
//! may carry a `detail` string, a `non_field_errors` list, or a map of field
//! names to their validation errors. Each of these has an extractor, and the
//! extractors are tried in order until one of them yields a non-empty message.
//!
//! Values are rendered the way a browser turns them into text: a list joins
//! its items with a bare comma and a `null` item becomes empty, while a
//! `null` on its own reads as `null`.

use reqwest::StatusCode;
use serde_json::Value;

pub type Extractor = fn(&Value) -> Option<String>;

/// The extractors, in priority order.
pub const EXTRACTORS: &[Extractor] = &[detail, non_field_errors, field_errors];

/// The login form only looks at these two, anything else is reported as bad
/// credentials.
pub const LOGIN_EXTRACTORS: &[Extractor] = &[non_field_errors, detail];

const SESSION_EXPIRED_PREFIX: &str =
    "Authentication required or session expired. Redirecting to login...";

/// Run the extractor chain, returning the first non-empty message.
pub fn extract(body: &Value) -> Option<String> {
    extract_with(EXTRACTORS, body)
}

pub fn extract_with(extractors: &[Extractor], body: &Value) -> Option<String> {
    extractors
        .iter()
        .filter_map(|extractor| extractor(body))
        .find(|msg| !msg.is_empty())
}

pub fn generic(status: StatusCode) -> String {
    format!("HTTP error! Status: {}", status.as_u16())
}

/// The message for a failed response, falling back to the generic status
/// message when the body is absent or carries nothing we recognise.
pub fn derive_message(status: StatusCode, body: Option<&Value>) -> String {
    body.and_then(extract)
        .unwrap_or_else(|| generic(status))
}

pub fn session_expired_message(derived: &str) -> String {
    format!("{} (Server Error: {})", SESSION_EXPIRED_PREFIX, derived)
}

/// True when a message already tells the user their session has ended.
pub fn indicates_session_expiry(message: &str) -> bool {
    message.contains("Authentication required") || message.contains("session expired")
}

/// `body.detail`, when it is present and truthy.
pub fn detail(body: &Value) -> Option<String> {
    body.get("detail")
        .filter(|v| is_truthy(v))
        .map(render_value)
}

/// `body.non_field_errors` joined with a comma.
pub fn non_field_errors(body: &Value) -> Option<String> {
    body.get("non_field_errors")
        .filter(|v| is_truthy(v))
        .map(join_errors)
}

/// Every entry of a structured body as `key: errors`, separated by `; `. A
/// top level list is keyed by position.
pub fn field_errors(body: &Value) -> Option<String> {
    let rendered: Vec<String> = match body {
        Value::Object(map) => map
            .iter()
            .map(|(field, errors)| format!("{}: {}", field, join_errors(errors)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, errors)| format!("{}: {}", idx, join_errors(errors)))
            .collect(),
        _ => return None,
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join("; "))
    }
}

fn join_errors(errors: &Value) -> String {
    match errors {
        Value::Array(items) => items
            .iter()
            .map(render_item)
            .collect::<Vec<_>>()
            .join(", "),
        other => render_value(other),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items.iter().map(render_item).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

// Inside a list, a missing value leaves a gap rather than reading `null`.
fn render_item(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => render_value(other),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

//! # HTTP Utilities
//!
//! Response-body helpers shared by the capability clients: strict JSON parsing
//! with a readable preview on failure, and extraction of the error message an
//! upstream service embedded in a non-success response.

use serde_json::Value;
use thiserror::Error;

/// Return a user-friendly hint for authentication failures.
///
/// # Example
/// ```rust
/// use devdeck_util::http::status_error_message;
///
/// let hint = status_error_message(401, "GITHUB_TOKEN").unwrap();
/// assert!(hint.contains("GITHUB_TOKEN"));
/// assert!(status_error_message(404, "GITHUB_TOKEN").is_none());
/// ```
pub fn status_error_message(status_code: u16, token_env_var: &str) -> Option<String> {
    match status_code {
        401 => Some(format!("Unauthorized (401). Hint: set {token_env_var}=...")),
        403 => Some("Forbidden (403). Hint: check token scopes and team access".into()),
        _ => None,
    }
}

/// Parse response text as JSON, returning `None` when the body is not JSON.
pub fn parse_response_json(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text).ok()
}

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// The error carries the status code and up to 200 characters of the body with
/// whitespace collapsed.
pub fn parse_response_json_strict(text: &str, status: Option<u16>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(text, 200);

        JsonParseError::new(status_note, error, preview)
    })
}

/// Pull the error message out of an upstream error body.
///
/// Understands `{"error": {"message": ...}}` (Vercel, chat completions),
/// `{"message": ...}` (GitHub, PostgREST) and `{"error": "..."}`.
///
/// # Example
/// ```rust
/// use devdeck_util::http::upstream_error_message;
/// use serde_json::json;
///
/// let body = json!({"error": {"code": "not_found", "message": "Project not found"}});
/// assert_eq!(upstream_error_message(&body).as_deref(), Some("Project not found"));
/// assert_eq!(upstream_error_message(&json!({"message": "Bad credentials"})).as_deref(), Some("Bad credentials"));
/// assert!(upstream_error_message(&json!([])).is_none());
/// ```
pub fn upstream_error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/error/message"),
        body.get("message"),
        body.get("error").filter(|value| value.is_string()),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Access the truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error payload returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// Extracts a display message from an error response body.
///
/// Accepts `{"detail": "..."}` as well as validation lists of the form
/// `{"detail": [{"msg": "..."}, ...]}`. Returns `None` when the body carries
/// nothing usable, so callers can substitute their own fallback text.
pub fn detail_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        Value::Array(items) => {
            let messages = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(msg) => Some(msg.as_str()),
                    other => other.get("msg").and_then(Value::as_str),
                })
                .collect::<Vec<_>>();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

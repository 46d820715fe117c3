use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<ChatMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ChatRequest {
    /// Request carrying only the message, with no context or correlation ids.
    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            session_id: None,
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Successful `POST /api/chat` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub metadata: ResponseMetadata,
    /// Filled from `RateLimit-*` response headers, never from the body.
    #[serde(skip)]
    pub rate_limit: Option<RateLimitInfo>,
}

/// Standard `RateLimit-*` header values reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Seconds until the window resets.
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Returns `None` when none of the headers are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let info = Self {
            limit: header_number(headers, "ratelimit-limit"),
            remaining: header_number(headers, "ratelimit-remaining"),
            reset: header_number(headers, "ratelimit-reset"),
        };
        if info == Self::default() {
            None
        } else {
            Some(info)
        }
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

/// `GET /api/health` body. Returned for both healthy (200) and degraded (503)
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub services: ServiceStatus,
    #[serde(default)]
    pub uptime: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

/// Error body returned by the server on non-2xx chat responses.
///
/// Each field is read on its own so one oddly typed sibling never hides the
/// server's `error` message.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ApiErrorBody {
    pub error: Option<String>,
    pub details: Option<Value>,
    pub retry_after: Option<u64>,
}

impl ApiErrorBody {
    pub(crate) fn parse(raw: &str) -> Self {
        let Ok(Value::Object(body)) = serde_json::from_str::<Value>(raw) else {
            return Self::default();
        };

        Self {
            error: body
                .get("error")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .map(str::to_string),
            details: body.get("details").filter(|v| !v.is_null()).cloned(),
            retry_after: body.get("retryAfter").and_then(retry_after_secs),
        }
    }
}

/// Whole seconds, rounded up. Accepts numbers and numeric strings.
fn retry_after_secs(value: &Value) -> Option<u64> {
    let secs = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(raw) => raw.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (secs.is_finite() && secs >= 0.0).then(|| secs.ceil() as u64)
}

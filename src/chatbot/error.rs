use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Every way a chat call can fail, each rendering as one user-facing line.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Non-2xx response. `message` is the server's `error` field when it sent
    /// one, otherwise `HTTP <status>`.
    #[error("API Error: {message}")]
    Api {
        status: StatusCode,
        message: String,
        details: Option<Value>,
        retry_after: Option<u64>,
    },

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Request failed: invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ChatError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(source) | Self::Decode(source) => source.status(),
            Self::InvalidBaseUrl { .. } => None,
        }
    }
}

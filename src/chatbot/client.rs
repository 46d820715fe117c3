use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::chatbot::error::ChatError;
use crate::chatbot::history::ConversationHistory;
use crate::chatbot::session::SessionId;
use crate::chatbot::types::{ApiErrorBody, ChatRequest, ChatResponse, HealthStatus, RateLimitInfo};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const CHAT_PATH: &str = "/api/chat";
const HEALTH_PATH: &str = "/api/health";

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(10),
        }
    }
}

/// Stateful client for one conversation with the chatbot API.
///
/// Each instance owns its session id and history. `chat` takes `&mut self`,
/// so an instance never has more than one request in flight.
#[derive(Debug)]
pub struct ChatbotClient {
    base_url: String,
    http: Client,
    options: ClientOptions,
    session_id: SessionId,
    user_id: Option<String>,
    history: ConversationHistory,
}

impl ChatbotClient {
    pub fn new(base_url: &str) -> Result<Self, ChatError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    pub fn with_options(base_url: &str, options: ClientOptions) -> Result<Self, ChatError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http: Client::new(),
            options,
            session_id: SessionId::generate(),
            user_id: None,
            history: ConversationHistory::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Sends `message` with the current history as the configured user.
    pub async fn chat(&mut self, message: &str) -> Result<ChatResponse, ChatError> {
        let user_id = self.user_id.clone();
        self.chat_as(message, user_id.as_deref()).await
    }

    /// Sends `message` with the current history, overriding the user id for
    /// this call when `user_id` is set. Empty ids are never sent.
    ///
    /// History is only extended when the server answers successfully.
    pub async fn chat_as(
        &mut self,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<ChatResponse, ChatError> {
        let request = ChatRequest {
            message: message.to_string(),
            context: Some(self.history.to_vec()),
            session_id: Some(self.session_id.to_string()),
            user_id: user_id
                .filter(|id| !id.is_empty())
                .or(self.user_id.as_deref())
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        };
        debug!(
            session_id = %self.session_id,
            context_len = self.history.len(),
            "sending chat request"
        );

        let response = self.post_chat(&request).await?;
        self.history.push_exchange(message, response.reply.clone());
        Ok(response)
    }

    /// Sends `message` alone, without context, session or user id. History
    /// is left untouched.
    pub async fn send_stateless(&self, message: &str) -> Result<ChatResponse, ChatError> {
        self.post_chat(&ChatRequest::bare(message)).await
    }

    /// Best-effort probe of `/api/health`.
    ///
    /// Any parseable body is returned regardless of status code; transport
    /// and decode failures are logged and yield `None`.
    pub async fn health_check(&self) -> Option<HealthStatus> {
        let raw = self.health_check_raw().await?;
        match serde_json::from_value(raw) {
            Ok(health) => Some(health),
            Err(err) => {
                warn!("Health check failed: unexpected body: {err}");
                None
            }
        }
    }

    /// Like [`health_check`](Self::health_check) but keeps the body as sent,
    /// including fields `HealthStatus` does not model.
    pub async fn health_check_raw(&self) -> Option<Value> {
        match self.fetch_health().await {
            Ok(body) => Some(body),
            Err(err) => {
                warn!("Health check failed: {err}");
                None
            }
        }
    }

    async fn fetch_health(&self) -> Result<Value, reqwest::Error> {
        let url = format!("{}{HEALTH_PATH}", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.options.health_timeout)
            .send()
            .await?;
        response.json().await
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let url = format!("{}{CHAT_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.options.timeout)
            .json(request)
            .send()
            .await
            .map_err(ChatError::Request)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let mut body: ChatResponse = response.json().await.map_err(ChatError::Decode)?;
        body.rate_limit = rate_limit;
        debug!(total_tokens = body.usage.total_tokens, "chat response received");
        Ok(body)
    }
}

async fn api_error(response: Response) -> ChatError {
    let status = response.status();
    let raw = response.text().await.unwrap_or_default();
    let body = ApiErrorBody::parse(&raw);
    let message = body.error.unwrap_or_else(|| format!("HTTP {status}"));

    ChatError::Api {
        status,
        message,
        details: body.details,
        retry_after: body.retry_after,
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ChatError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let invalid = |reason: String| ChatError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

//! Chatbot API client.
//!
//! The client keeps one session identifier and a bounded conversation
//! history per instance and issues one request at a time. There is no retry:
//! every failure surfaces as a [`ChatError`] carrying a single message.

/// Sequential HTTP client for `/api/chat` and `/api/health`.
pub mod client;
/// Collapsed error type for chat calls.
pub mod error;
/// Bounded conversation history.
pub mod history;
/// Client-generated session identifiers.
pub mod session;
/// Request and response payloads.
pub mod types;

pub use client::{ChatbotClient, ClientOptions, DEFAULT_BASE_URL};
pub use error::ChatError;
pub use history::{ConversationHistory, MAX_HISTORY};
pub use session::SessionId;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, HealthStatus, RateLimitInfo, ResponseMetadata, Role,
    Usage,
};

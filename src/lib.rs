//! Client-side tooling for the chatbot API.
//!
//! [`chatbot`] holds the HTTP client with session and bounded-history
//! bookkeeping. [`embeddings`] wraps the sentence-embedding model used by the
//! `embedding-server` binary.

/// CLI subcommand implementations shared by the binaries.
pub mod commands;
/// Profile file loading and option resolution.
pub mod config;
/// Chatbot API client, conversation history and wire types.
pub mod chatbot;
/// Sentence-embedding request handling and the ONNX model wrapper.
pub mod embeddings;
/// Stderr tracing subscriber setup.
pub mod logging;

/// Version string with build metadata, shared by every binary's `--version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit: ",
    env!("CHATBOT_GIT_SHA"),
    ", built: ",
    env!("CHATBOT_BUILD_TS"),
    ")"
);

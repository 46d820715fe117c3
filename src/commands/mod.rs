use clap::Args;

use crate::config::{ConnectionOverrides, ConnectionSettings, resolve_connection};

/// `chatbot chat`: one-shot message or interactive loop.
pub mod chat;
/// `chatbot config`: profile file checks.
pub mod config;
/// `chatbot demo`: canned usage scenarios.
pub mod demo;
/// `chatbot embed` and the `embedding-server` binary.
pub mod embed;
/// `chatbot health`: service probe.
pub mod health;

/// Connection flags shared by every subcommand that talks to the API.
#[derive(Debug, Args, Clone, Default)]
pub struct ConnectionArgs {
    /// Base URL of the chatbot API [env: CHATBOT_BASE_URL] [default: http://localhost:3000]
    #[arg(long)]
    pub base_url: Option<String>,
    /// User identifier sent with chat requests [env: CHATBOT_USER_ID]
    #[arg(long)]
    pub user_id: Option<String>,
    /// Chat request timeout in seconds [env: CHATBOT_TIMEOUT] [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
    /// Profile name from the config file
    #[arg(long)]
    pub profile: Option<String>,
}

impl ConnectionArgs {
    pub fn resolve(&self) -> Result<ConnectionSettings, String> {
        resolve_connection(
            &ConnectionOverrides {
                base_url: self.base_url.clone(),
                user_id: self.user_id.clone(),
                timeout: self.timeout,
            },
            self.profile.as_deref(),
        )
    }
}

/// Logging flags shared by every subcommand.
#[derive(Debug, Args, Clone, Copy, Default)]
pub struct LogArgs {
    /// Log request details to stderr
    #[arg(long)]
    pub verbose: bool,
    /// Suppress all diagnostics on stderr except fatal errors
    #[arg(long)]
    pub quiet: bool,
}

impl LogArgs {
    pub fn init(self, default_level: &str) {
        crate::logging::init(
            crate::logging::Verbosity::from_flags(self.quiet, self.verbose),
            default_level,
        );
    }
}

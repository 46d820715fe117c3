use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "CHATBOT_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// `quiet` wins over `verbose` when both are set.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }
}

/// Installs a stderr subscriber.
///
/// `default_level` applies when neither a flag nor `CHATBOT_LOG` selects a
/// filter. Calling this twice is harmless; the second install is ignored.
pub fn init(verbosity: Verbosity, default_level: &str) {
    let filter = match verbosity {
        Verbosity::Quiet => EnvFilter::new("off"),
        Verbosity::Verbose => EnvFilter::new("debug"),
        Verbosity::Normal => EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_level)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

use clap::{Args, Subcommand};

use crate::config;

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand, Clone)]
enum ConfigSubcommand {
    /// Parse the config file and validate its profiles
    Check {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print the resolved connection settings
    Show {
        #[arg(long)]
        profile: Option<String>,
    },
}

pub fn run(args: ConfigArgs) -> Result<(), String> {
    match args.command {
        ConfigSubcommand::Check { profile } => {
            let path = config::validate_config(profile.as_deref())?;
            println!("config OK: {}", path.display());
            Ok(())
        }
        ConfigSubcommand::Show { profile } => {
            let settings =
                config::resolve_connection(&config::ConnectionOverrides::default(), profile.as_deref())?;
            println!("base_url: {}", settings.base_url);
            println!(
                "user_id: {}",
                settings.user_id.as_deref().unwrap_or("(none)")
            );
            println!("timeout: {}s", settings.options.timeout.as_secs());
            println!(
                "health_timeout: {}s",
                settings.options.health_timeout.as_secs()
            );
            Ok(())
        }
    }
}

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::chatbot::{ClientOptions, DEFAULT_BASE_URL};
use crate::embeddings::MODEL_NAME;

pub const CONFIG_ENV: &str = "CHATBOT_CONFIG";
pub const BASE_URL_ENV: &str = "CHATBOT_BASE_URL";
pub const USER_ID_ENV: &str = "CHATBOT_USER_ID";
pub const TIMEOUT_ENV: &str = "CHATBOT_TIMEOUT";
pub const MODEL_DIR_ENV: &str = "CHATBOT_MODEL_DIR";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub timeout: Option<u64>,
    pub health_timeout: Option<u64>,
    pub model_dir: Option<PathBuf>,
    pub embedding_model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

/// Connection values given on the command line, highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub user_id: Option<String>,
    pub options: ClientOptions,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// Local export directory. `None` means fetch from the Hub.
    pub model_dir: Option<PathBuf>,
    pub model_id: String,
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;

    profiles.get(name).cloned().ok_or_else(|| {
        format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        )
    })
}

/// Parses the config file and checks every profile (or just `profile`).
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;

    let selected: Vec<(&String, &ProfileConfig)> = match profile {
        Some(name) => {
            let (key, value) = profiles.get_key_value(name).ok_or_else(|| {
                format!(
                    "Profile '{}' not found in config file '{}'.",
                    name,
                    path.display()
                )
            })?;
            vec![(key, value)]
        }
        None => profiles.iter().collect(),
    };

    for (name, profile) in selected {
        if let Some(base_url) = &profile.base_url {
            check_base_url(base_url)
                .map_err(|reason| format!("Invalid profile base_url '{base_url}' in '{name}': {reason}"))?;
        }
        if profile.timeout == Some(0) || profile.health_timeout == Some(0) {
            return Err(format!(
                "Invalid profile timeout in '{name}': must be greater than 0 seconds."
            ));
        }
    }

    Ok(path)
}

pub fn resolve_connection(
    overrides: &ConnectionOverrides,
    profile: Option<&str>,
) -> Result<ConnectionSettings, String> {
    let profile = profile.map(load_profile).transpose()?.unwrap_or_default();
    resolve_connection_with(overrides, &profile, env_value)
}

pub fn resolve_embedding(
    model_dir: Option<PathBuf>,
    profile: Option<&str>,
) -> Result<EmbeddingSettings, String> {
    let profile = profile.map(load_profile).transpose()?.unwrap_or_default();
    Ok(resolve_embedding_with(model_dir, &profile, env_value))
}

/// Applies CLI > environment > profile > default precedence. `env` is the
/// environment lookup, injected so the precedence rules stay testable.
pub(crate) fn resolve_connection_with(
    overrides: &ConnectionOverrides,
    profile: &ProfileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ConnectionSettings, String> {
    let base_url = overrides
        .base_url
        .clone()
        .or_else(|| env(BASE_URL_ENV))
        .or_else(|| profile.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let user_id = overrides
        .user_id
        .clone()
        .or_else(|| env(USER_ID_ENV))
        .or_else(|| profile.user_id.clone());

    let env_timeout = env(TIMEOUT_ENV)
        .map(|raw| {
            raw.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                format!("Invalid {TIMEOUT_ENV} '{raw}'. Expected a positive number of seconds.")
            })
        })
        .transpose()?;

    let defaults = ClientOptions::default();
    let timeout = overrides
        .timeout
        .or(env_timeout)
        .or(profile.timeout)
        .map(Duration::from_secs)
        .unwrap_or(defaults.timeout);
    let health_timeout = profile
        .health_timeout
        .map(Duration::from_secs)
        .unwrap_or(defaults.health_timeout);

    if timeout.is_zero() || health_timeout.is_zero() {
        return Err("Timeouts must be greater than 0 seconds.".to_string());
    }

    Ok(ConnectionSettings {
        base_url,
        user_id,
        options: ClientOptions {
            timeout,
            health_timeout,
        },
    })
}

pub(crate) fn resolve_embedding_with(
    model_dir: Option<PathBuf>,
    profile: &ProfileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> EmbeddingSettings {
    EmbeddingSettings {
        model_dir: model_dir
            .or_else(|| env(MODEL_DIR_ENV).map(PathBuf::from))
            .or_else(|| profile.model_dir.clone()),
        model_id: profile
            .embedding_model
            .clone()
            .unwrap_or_else(|| MODEL_NAME.to_string()),
    }
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;

    let config: ConfigFile = toml::from_str(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))?;

    config.profiles.ok_or_else(|| {
        format!(
            "Config file '{}' does not contain a [profiles] section.",
            path.display()
        )
    })
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let parsed = Url::parse(raw).map_err(|err| err.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn config_path() -> Result<PathBuf, String> {
    if let Some(path) = env_value(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = env_value("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("chatbot").join("config.toml"));
    }

    let home = env::var("HOME").map_err(|_| {
        format!("Cannot resolve config path: set {CONFIG_ENV} or HOME/XDG_CONFIG_HOME.")
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("chatbot")
        .join("config.toml"))
}

//! Configuration loading.
//!
//! Settings come from an optional TOML file (`~/.config/nox/config.toml`)
//! overlaid by environment variables; the environment always wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nox_core::config::AppConfig;
use nox_core::identity::RoleId;
use nox_core::NoxError;
use serde::Deserialize;

pub const ENV_CATEGORY_ID: &str = "INTERVIEW_CATEGORY_ID";
pub const ENV_OFFICER_ROLE_ID: &str = "OFFICER_ROLE_ID";
pub const ENV_ADMIN_ROLE_ID: &str = "ADMIN_ROLE_ID";
pub const ENV_CHANNEL_PREFIX: &str = "APPLICATION_CHANNEL_PREFIX";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_SESSION_IDLE_TIMEOUT: &str = "SESSION_IDLE_TIMEOUT";

/// Every field optional: the file may set any subset.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    category_id: Option<u64>,
    officer_role_id: Option<RoleId>,
    admin_role_id: Option<RoleId>,
    channel_prefix: Option<String>,
    log_level: Option<String>,
    session_idle_timeout: Option<String>,
}

/// Loads configuration from the default file location and the process environment.
pub fn load() -> Result<AppConfig> {
    let file = match default_config_path() {
        Some(path) if path.exists() => Some(read_file(&path)?),
        _ => None,
    };
    let env: HashMap<String, String> = std::env::vars().collect();
    Ok(resolve(file, &env)?)
}

/// Loads configuration from an explicit file plus the process environment.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let file = read_file(path)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    Ok(resolve(Some(file), &env)?)
}

/// Returns `~/.config/nox/config.toml`, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nox").join("config.toml"))
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file at {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse configuration file at {}", path.display()))
}

fn non_empty<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Optional role ids that are not numeric are ignored with a warning.
fn optional_role(env: &HashMap<String, String>, key: &str) -> Option<Option<RoleId>> {
    let raw = non_empty(env, key)?;
    match raw.parse::<RoleId>() {
        Ok(id) => Some(Some(id)),
        Err(_) => {
            tracing::warn!("[Config] {} is set but not numeric - ignoring", key);
            Some(None)
        }
    }
}

fn resolve(
    file: Option<FileConfig>,
    env: &HashMap<String, String>,
) -> nox_core::Result<AppConfig> {
    let file = file.unwrap_or_default();

    let category_id = match non_empty(env, ENV_CATEGORY_ID) {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            NoxError::config(format!(
                "{} must be a valid numeric channel id, got '{}'",
                ENV_CATEGORY_ID, raw
            ))
        })?,
        None => file
            .category_id
            .ok_or_else(|| NoxError::config(format!("{} is required", ENV_CATEGORY_ID)))?,
    };

    let mut config = AppConfig::new(category_id);
    config.officer_role_id = optional_role(env, ENV_OFFICER_ROLE_ID).unwrap_or(file.officer_role_id);
    config.admin_role_id = optional_role(env, ENV_ADMIN_ROLE_ID).unwrap_or(file.admin_role_id);
    if let Some(prefix) = non_empty(env, ENV_CHANNEL_PREFIX)
        .map(str::to_string)
        .or(file.channel_prefix)
    {
        config.channel_prefix = prefix;
    }
    if let Some(level) = non_empty(env, ENV_LOG_LEVEL)
        .map(str::to_string)
        .or(file.log_level)
    {
        config.log_level = level;
    }
    config.session_idle_timeout = non_empty(env, ENV_SESSION_IDLE_TIMEOUT)
        .map(str::to_string)
        .or(file.session_idle_timeout);

    config.validate()?;
    Ok(config)
}

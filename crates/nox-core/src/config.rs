//! Workflow configuration model.
//!
//! Loading (environment variables, config file) lives in the infrastructure
//! layer; this module only defines the shape and its validation.

use serde::{Deserialize, Serialize};

use crate::error::{NoxError, Result};
use crate::identity::{CategoryId, RoleId};
use crate::review::DEFAULT_SURFACE_PREFIX;
use crate::timespec::TimeSpec;

fn default_channel_prefix() -> String {
    DEFAULT_SURFACE_PREFIX.to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Category review surfaces are created under.
    pub category_id: CategoryId,
    #[serde(default)]
    pub officer_role_id: Option<RoleId>,
    #[serde(default)]
    pub admin_role_id: Option<RoleId>,
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Idle timeout for sessions as a TimeSpec string (`"30m"`, `"2h"`).
    #[serde(default)]
    pub session_idle_timeout: Option<String>,
}

impl AppConfig {
    pub fn new(category_id: CategoryId) -> Self {
        Self {
            category_id,
            officer_role_id: None,
            admin_role_id: None,
            channel_prefix: default_channel_prefix(),
            log_level: default_log_level(),
            session_idle_timeout: None,
        }
    }

    /// Roles allowed to run staff commands and see review surfaces.
    pub fn staff_roles(&self) -> Vec<RoleId> {
        self.officer_role_id
            .into_iter()
            .chain(self.admin_role_id)
            .collect()
    }

    pub fn idle_timeout(&self) -> Result<Option<TimeSpec>> {
        self.session_idle_timeout
            .as_deref()
            .map(str::parse::<TimeSpec>)
            .transpose()
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.category_id == 0 {
            return Err(NoxError::config("category id must be a non-zero number"));
        }
        let prefix = self.channel_prefix.trim();
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            return Err(NoxError::config(format!(
                "invalid channel prefix '{}'",
                self.channel_prefix
            )));
        }
        self.idle_timeout()
            .map_err(|e| NoxError::config(format!("session idle timeout: {}", e)))?;
        Ok(())
    }
}

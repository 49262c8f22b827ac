/*!
 * Broker Configuration
 * Sandbox mode selection from JSON or the environment
 */

use super::allowlist::AllowList;
use crate::security::types::InitError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path to a JSON configuration file (takes precedence over the other variables)
pub const CONFIG_PATH_ENV: &str = "BROKER_CONFIG";

/// Colon-separated allow-list roots
pub const ALLOW_ROOTS_ENV: &str = "BROKER_ALLOW_ROOTS";

/// Set to `1` or `true` to disable path checks entirely
pub const UNSANDBOXED_ENV: &str = "BROKER_UNSANDBOXED";

/// How paths are checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SandboxMode {
    /// Only paths under these roots are admitted
    Sandboxed { roots: Vec<String> },
    /// Every resolvable path is admitted. Must be chosen explicitly.
    Unsandboxed,
}

/// Broker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(flatten)]
    pub mode: SandboxMode,
}

impl BrokerConfig {
    pub fn sandboxed<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: SandboxMode::Sandboxed {
                roots: roots.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn unsandboxed() -> Self {
        Self {
            mode: SandboxMode::Unsandboxed,
        }
    }

    /// Parse `{"mode": "sandboxed", "roots": [...]}` or `{"mode": "unsandboxed"}`
    pub fn from_json(json: &str) -> Result<Self, InitError> {
        serde_json::from_str(json).map_err(|e| InitError::ConfigParse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InitError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| InitError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, InitError> {
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// Absent configuration is an error; unrestricted access is never implied.
    pub fn from_env_vars<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::from_file(path);
        }

        let roots = lookup(ALLOW_ROOTS_ENV).filter(|r| !r.is_empty());
        let unsandboxed = lookup(UNSANDBOXED_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        match (roots, unsandboxed) {
            (Some(_), true) => Err(InitError::ConflictingModes),
            (Some(roots), false) => Ok(Self::sandboxed(roots.split(':'))),
            (None, true) => Ok(Self::unsandboxed()),
            (None, false) => Err(InitError::MissingConfiguration),
        }
    }

    /// Normalize roots into an allow-list
    pub fn build_allow_list(&self) -> Result<AllowList, InitError> {
        match &self.mode {
            SandboxMode::Sandboxed { roots } => AllowList::sandboxed(roots),
            SandboxMode::Unsandboxed => Ok(AllowList::unrestricted()),
        }
    }

    pub fn is_unsandboxed(&self) -> bool {
        matches!(self.mode, SandboxMode::Unsandboxed)
    }
}

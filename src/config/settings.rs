//! User-wide settings for dotgate
//!
//! Handles configuration stored in ~/.config/dotgate/config.toml. Every
//! field has a default, so the tool works with no settings file at all;
//! a machine being provisioned for the first time has none.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for dotgate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Settings {
    /// The private repository access is resolved for
    #[serde(default)]
    pub repository: RepositorySettings,
    /// Credential sources
    #[serde(default)]
    pub auth: AuthSettings,
    /// GitHub endpoints; only changed for GitHub Enterprise hosts
    #[serde(default)]
    pub github: GithubSettings,
    /// SSH client behavior
    #[serde(default)]
    pub ssh: SshSettings,
    /// Interactive recovery behavior
    #[serde(default)]
    pub recovery: RecoverySettings,
}

/// Which repository to resolve access for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositorySettings {
    /// Repository owner (the account whose published keys are checked)
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Repository name
    #[serde(default = "default_repo_name")]
    pub name: String,
}

/// Credential source configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSettings {
    /// Environment variables checked for a bearer token, in order
    #[serde(default = "default_token_env_vars")]
    pub token_env_vars: Vec<String>,
    /// Path of the deploy key private half; `~` is expanded
    #[serde(default = "default_deploy_key")]
    pub deploy_key: String,
}

/// GitHub endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubSettings {
    /// Base URL serving `<owner>.keys` pages
    #[serde(default = "default_web_base")]
    pub web_base: String,
    /// Base URL of the REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// SSH client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshSettings {
    /// Git host the handshake probes talk to
    #[serde(default = "default_git_host")]
    pub git_host: String,
    /// Host alias written to ~/.ssh/config for the deploy key
    #[serde(default = "default_host_alias")]
    pub host_alias: String,
    /// Connect timeout for handshake probes and key scans, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Interactive recovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecoverySettings {
    /// Bounded number of deploy-key retries after the human confirms
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_owner() -> String {
    "scowalt".to_string()
}

fn default_repo_name() -> String {
    "dotfiles".to_string()
}

fn default_token_env_vars() -> Vec<String> {
    vec!["GH_TOKEN_SCOWALT".to_string(), "GITHUB_TOKEN".to_string()]
}

fn default_deploy_key() -> String {
    "~/.ssh/github-dotfiles".to_string()
}

fn default_web_base() -> String {
    crate::github::WEB_BASE.to_string()
}

fn default_api_base() -> String {
    crate::github::API_BASE.to_string()
}

fn default_git_host() -> String {
    "github.com".to_string()
}

fn default_host_alias() -> String {
    "github-dotfiles".to_string()
}

const fn default_connect_timeout() -> u64 {
    5
}

const fn default_max_attempts() -> u32 {
    5
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            name: default_repo_name(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_env_vars: default_token_env_vars(),
            deploy_key: default_deploy_key(),
        }
    }
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            web_base: default_web_base(),
            api_base: default_api_base(),
        }
    }
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            git_host: default_git_host(),
            host_alias: default_host_alias(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl Settings {
    /// Load settings from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined
    /// or the file cannot be read
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::from_file(&config_path)
    }

    /// Load settings from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            // Return defaults if the file doesn't exist
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write settings file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the default settings file path
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Unable to determine config directory")?;

        Ok(config_dir.join("dotgate").join("config.toml"))
    }

    /// The deploy key private-half path with `~` expanded
    #[must_use]
    pub fn deploy_key_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.auth.deploy_key).into_owned())
    }

    /// The `owner/name` slug used in messages and key comments
    #[must_use]
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.repository.owner, self.repository.name)
    }
}

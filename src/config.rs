//! Deployment configuration
//!
//! Loaded once at startup from an optional TOML file, then overridden by
//! environment variables. Components receive the parts they need explicitly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};

pub const DEFAULT_BRANCH: &str = "deploy";
pub const DEFAULT_CONTAINER: &str = "odoo-odoo-1";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8040";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_update_command() -> Vec<String> {
    [
        "odoo",
        "-d",
        "odoo",
        "-c",
        "/etc/odoo/odoo.conf",
        "-u",
        "all",
        "--stop-after-init",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeployConfig {
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default)]
    pub repo_path: PathBuf,
    #[serde(default)]
    pub remote_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Name of the running application container
    #[serde(default = "default_container")]
    pub container: String,
    /// Command executed inside the container after a force-update
    #[serde(default = "default_update_command")]
    pub update_command: Vec<String>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Run the container update after a fresh clone as well
    #[serde(default)]
    pub reload_after_clone: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            repo_path: PathBuf::new(),
            remote_url: String::new(),
            branch: default_branch(),
            container: default_container(),
            update_command: default_update_command(),
            command_timeout_secs: default_command_timeout(),
            reload_after_clone: false,
            bind_address: default_bind_address(),
            log_dir: None,
        }
    }
}

/// The working copy to keep in sync with one remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub repo_path: PathBuf,
    pub remote_url: String,
    pub branch: String,
}

impl DeploymentTarget {
    /// Full reference form of the deployment branch, e.g. `refs/heads/deploy`
    pub fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Remote-tracking reference the working copy is reset to
    pub fn remote_branch(&self) -> String {
        format!("origin/{}", self.branch)
    }
}

impl DeployConfig {
    /// Load the optional TOML file at `path`, then apply process environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                DeployError::ConfigError(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment variables, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GITHUB_WEBHOOK_SECRET") {
            self.webhook_secret = v;
        }
        if let Some(v) = lookup("LOCAL_DEPLOY_REPO") {
            self.repo_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("REMOTE_REPO_URL") {
            self.remote_url = v;
        }
        if let Some(v) = lookup("DEPLOY_BRANCH").filter(|v| !v.is_empty()) {
            self.branch = v;
        }
        if let Some(v) = lookup("DEPLOY_CONTAINER").filter(|v| !v.is_empty()) {
            self.container = v;
        }
        if let Some(v) = lookup("COMMAND_TIMEOUT_SECS") {
            self.command_timeout_secs = v.trim().parse().map_err(|e| {
                DeployError::ConfigError(format!("Invalid COMMAND_TIMEOUT_SECS '{}': {}", v, e))
            })?;
        }
        if let Some(v) = lookup("RELOAD_AFTER_CLONE") {
            self.reload_after_clone = parse_bool(&v).ok_or_else(|| {
                DeployError::ConfigError(format!("Invalid RELOAD_AFTER_CLONE '{}'", v))
            })?;
        }
        if let Some(v) = lookup("BIND_ADDRESS").filter(|v| !v.is_empty()) {
            self.bind_address = v;
        }
        if let Some(v) = lookup("LOG_DIR").filter(|v| !v.is_empty()) {
            self.log_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn target(&self) -> DeploymentTarget {
        DeploymentTarget {
            repo_path: self.repo_path.clone(),
            remote_url: self.remote_url.clone(),
            branch: self.branch.clone(),
        }
    }

    /// Returns a warning for every setting that will make deployments fail.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.webhook_secret.is_empty() {
            warnings.push(
                "GITHUB_WEBHOOK_SECRET is not set; every webhook will be rejected".to_string(),
            );
        }
        if self.repo_path.as_os_str().is_empty() {
            warnings.push("LOCAL_DEPLOY_REPO is not set; synchronization will fail".to_string());
        }
        if self.remote_url.is_empty() {
            warnings.push("REMOTE_REPO_URL is not set; cloning will fail".to_string());
        }
        if self.update_command.is_empty() {
            warnings.push("update_command is empty; container updates will fail".to_string());
        }
        warnings
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

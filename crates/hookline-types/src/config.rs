//! Global configuration types for Hookline.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! HTTP listener, API key checking, job bookkeeping and tool settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the bridge.
///
/// Loaded from `~/.hookline/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl GlobalConfig {
    /// Reject settings that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.header.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.header must not be empty".to_string()));
        }
        let threshold = self.jobs.default_sync_threshold_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "jobs.default_sync_threshold_secs must be a non-negative number, got {threshold}"
            )));
        }
        if self.jobs.max_concurrent_jobs == Some(0) {
            return Err(ConfigError::Invalid(
                "jobs.max_concurrent_jobs must be at least 1 (omit it for no limit)".to_string(),
            ));
        }
        if self.jobs.list_limit == 0 {
            return Err(ConfigError::Invalid("jobs.list_limit must be at least 1".to_string()));
        }
        if self.jobs.sweep_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "jobs.sweep_interval_secs must be at least 1 (omit it to disable the sweeper)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Shared-secret API key checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The expected key. When unset, every authenticated route is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Header carrying the key.
    #[serde(default = "default_api_key_header")]
    pub header: String,
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            header: default_api_key_header(),
        }
    }
}

/// Job bookkeeping knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Seconds an HTTP tool call waits for its job before returning the job id.
    #[serde(default = "default_sync_threshold_secs")]
    pub default_sync_threshold_secs: f64,
    /// Upper bound on simultaneously executing jobs (None = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_jobs: Option<usize>,
    /// Default age used by an expire call to mark pending/running jobs expired.
    #[serde(default = "default_expire_after_secs")]
    pub expire_after_secs: u64,
    /// Age after which terminal jobs are removed by a purge.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Maximum number of jobs rendered individually in a status listing.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
    /// Seconds between background expire/purge passes in `serve`.
    /// Unset means jobs are only expired or purged on an explicit request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
}

fn default_sync_threshold_secs() -> f64 {
    3.0
}

fn default_expire_after_secs() -> u64 {
    3600
}

fn default_retention_secs() -> u64 {
    86_400
}

fn default_list_limit() -> usize {
    20
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            default_sync_threshold_secs: default_sync_threshold_secs(),
            max_concurrent_jobs: None,
            expire_after_secs: default_expire_after_secs(),
            retention_secs: default_retention_secs(),
            list_limit: default_list_limit(),
            sweep_interval_secs: None,
        }
    }
}

/// Settings for the bundled tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Executable used by the `goose` tool.
    #[serde(default = "default_goose_binary")]
    pub goose_binary: String,
    /// URL opened by the `confetti` tool.
    #[serde(default = "default_confetti_url")]
    pub confetti_url: String,
    /// Whether completion notifications are delivered.
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_goose_binary() -> String {
    "goose".to_string()
}

fn default_confetti_url() -> String {
    "raycast://confetti".to_string()
}

fn default_notifications() -> bool {
    true
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            goose_binary: default_goose_binary(),
            confetti_url: default_confetti_url(),
            notifications: default_notifications(),
        }
    }
}

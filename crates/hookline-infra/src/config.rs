//! Global configuration loader for Hookline.
//!
//! Reads `config.toml` from the data directory (`~/.hookline/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed. A few settings can then be
//! overridden from the environment.

use std::path::Path;

use hookline_types::config::GlobalConfig;
use hookline_types::error::ConfigError;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "HOOKLINE_API_KEY";
/// Environment variable overriding `server.host`.
pub const ENV_HOST: &str = "HOOKLINE_HOST";
/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "HOOKLINE_PORT";

/// Read and parse `path`. `Ok(None)` means the file does not exist.
pub async fn read_config_file(path: &Path) -> Result<Option<GlobalConfig>, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    toml::from_str::<GlobalConfig>(&content)
        .map(Some)
        .map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    match read_config_file(&config_path).await {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            GlobalConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            GlobalConfig::default()
        }
    }
}

/// Load the config file, then apply `HOOKLINE_*` environment overrides.
pub async fn load_config_with_env(data_dir: &Path) -> GlobalConfig {
    let mut config = load_global_config(data_dir).await;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Apply overrides from `lookup` (normally the process environment).
///
/// Empty values are ignored. An unparseable port is logged and ignored.
pub fn apply_overrides(config: &mut GlobalConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get(ENV_API_KEY) {
        config.auth.api_key = Some(key);
    }
    if let Some(host) = get(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(port) = get(ENV_PORT) {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(err) => tracing::warn!("Ignoring {ENV_PORT}={port}: {err}"),
        }
    }
}

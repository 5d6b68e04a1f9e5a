//! Data directory layout.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "HOOKLINE_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `HOOKLINE_DATA_DIR` environment variable
/// 2. `~/.hookline`
/// 3. `.hookline` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".hookline");
    }

    PathBuf::from(".hookline")
}

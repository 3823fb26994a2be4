mod config;
pub mod database;
pub mod migrations;

pub use config::{BackendConfig, BackendKind, Config, CycleConfig, NotificationsConfig};
pub use database::{Database, Stats};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/studdyhub[-dev]/` based on STUDDYHUB_ENV.
///
/// Set STUDDYHUB_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDDYHUB_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studdyhub-dev")
    } else {
        base_dir.join("studdyhub")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

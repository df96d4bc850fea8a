//! Subcommand implementations.

pub mod config_cmd;
pub mod doctor;
pub mod init;
pub mod portfolio;
pub mod predict;
pub mod schema;
pub mod serve;

use std::path::{Path, PathBuf};

use churnguard_config::{AppConfig, ConfigError};

/// `~/.churnguard/config.toml`.
pub fn default_config_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

/// Load `path`, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    AppConfig::load_with(path, |key| std::env::var(key).ok())
}

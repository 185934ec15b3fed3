//! Configuration loader

use std::path::Path;

use termlink_utils::{config_file, Result, TermlinkError};
use tracing::debug;

use super::AppConfig;

/// Largest accepted `max_sessions`
const MAX_SESSIONS_CEILING: usize = 64;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| TermlinkError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| TermlinkError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        let max = config.terminal.max_sessions;
        if max == 0 || max > MAX_SESSIONS_CEILING {
            return Err(TermlinkError::config(format!(
                "max_sessions must be between 1 and {}",
                MAX_SESSIONS_CEILING
            )));
        }

        if config.terminal.title_poll_interval_ms < 100 {
            return Err(TermlinkError::config(
                "title_poll_interval_ms must be at least 100",
            ));
        }

        if config.terminal.resize_debounce_ms > 1000 {
            return Err(TermlinkError::config(
                "resize_debounce_ms must be at most 1000",
            ));
        }

        if config.inject.program.trim().is_empty() {
            return Err(TermlinkError::config("inject.program must not be empty"));
        }

        if !config.server.ws_path.starts_with('/') {
            return Err(TermlinkError::config("ws_path must start with '/'"));
        }

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<AppConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load and validate from an explicit path
    pub fn load_and_validate_from(path: &Path) -> Result<AppConfig> {
        let config = Self::load_from_path(path)?;
        Self::validate(&config)?;
        Ok(config)
    }
}

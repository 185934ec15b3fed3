//! Path utilities for termlink
//!
//! Handles XDG Base Directory lookups for config and state directories,
//! plus the user's home directory used when resolving shell environments.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

/// Application identifier for XDG directories
const APP_NAME: &str = "termlink";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the user's home directory
///
/// Falls back to `$HOME`, then `/tmp`, when the platform lookup fails.
pub fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// Get the conventional per-user binary directory (`~/.local/bin`)
pub fn user_bin_dir() -> PathBuf {
    home_dir().join(".local").join("bin")
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/termlink` or `~/.config/termlink`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".config").join(APP_NAME))
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/termlink/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/termlink` or `~/.local/state/termlink`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| home_dir().join(".local").join("state").join(APP_NAME))
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/termlink/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

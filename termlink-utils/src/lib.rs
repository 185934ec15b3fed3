//! termlink-utils: Common utilities shared across termlink crates
//!
//! This crate provides:
//! - Unified error types ([`TermlinkError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Result, TermlinkError};
pub use logging::{init_logging_with_config, LogConfig, LogOutput, LOG_ENV_VAR};
pub use paths::{config_dir, config_file, home_dir, log_dir, state_dir, user_bin_dir};

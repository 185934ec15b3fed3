//! Error types for termlink
//!
//! Provides a unified error type used across all termlink crates.

use std::path::PathBuf;

/// Main error type for termlink operations
#[derive(Debug, thiserror::Error)]
pub enum TermlinkError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === PTY Errors ===

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TermlinkError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a PTY error
    pub fn pty(msg: impl Into<String>) -> Self {
        Self::Pty(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error came from a process that is already gone.
    ///
    /// Writes and resizes against an exiting PTY fail this way, which the
    /// server logs quietly instead of as a failure.
    pub fn is_process_gone(&self) -> bool {
        match self {
            Self::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::NotConnected
                        | std::io::ErrorKind::UnexpectedEof
                ) || is_eio(e)
            }
            _ => false,
        }
    }
}

/// EIO, how a PTY master reports that the slave side has closed
#[cfg(unix)]
fn is_eio(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(5)
}

#[cfg(not(unix))]
fn is_eio(_e: &std::io::Error) -> bool {
    false
}

/// Result type alias using TermlinkError
pub type Result<T> = std::result::Result<T, TermlinkError>;

//! Pseudo-terminal facility
//!
//! Sessions talk to a running shell only through [`PtyProcess`], and obtain
//! new ones through [`PtyBackend`]. The native backend is backed by
//! portable-pty; tests substitute an in-memory one.

use std::io::Read;
use std::sync::Arc;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use termlink_utils::{Result, TermlinkError};
use tracing::debug;

use super::{PtyConfig, PtyHandle};

/// Operations on a live pseudo-terminal process
pub trait PtyProcess: Send + Sync {
    /// Write bytes to the process input
    fn write_all(&self, data: &[u8]) -> Result<()>;

    /// Change the terminal size
    fn resize(&self, cols: u16, rows: u16) -> Result<()>;

    /// Forcibly terminate the process
    fn kill(&self) -> Result<()>;

    /// Block until the process exits and return its exit code
    fn wait(&self) -> Result<i32>;

    /// Name of the process currently in the foreground of the terminal
    fn process_name(&self) -> Option<String>;
}

/// A freshly spawned process plus its output stream
pub struct SpawnedPty {
    pub process: Arc<dyn PtyProcess>,
    /// Blocking reader for terminal output; reaches EOF once the process is gone
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for SpawnedPty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedPty").finish_non_exhaustive()
    }
}

/// Allocates pseudo-terminals
pub trait PtyBackend: Send + Sync {
    fn spawn(&self, config: &PtyConfig) -> Result<SpawnedPty>;
}

/// Backend using the operating system's PTY support
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtyBackend;

impl PtyBackend for NativePtyBackend {
    fn spawn(&self, config: &PtyConfig) -> Result<SpawnedPty> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: config.size.rows,
                cols: config.size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TermlinkError::pty(format!("Failed to open PTY: {}", e)))?;

        let mut cmd = CommandBuilder::new(&config.command);
        cmd.args(&config.args);

        if let Some(cwd) = &config.cwd {
            cmd.cwd(cwd);
        }

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TermlinkError::ProcessSpawn(e.to_string()))?;

        // The reader only sees EOF once every slave handle is closed
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TermlinkError::pty(format!("Failed to clone reader: {}", e)))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TermlinkError::pty(format!("Failed to get writer: {}", e)))?;

        debug!(
            command = %config.command,
            pid = ?child.process_id(),
            cols = config.size.cols,
            rows = config.size.rows,
            "Spawned PTY process"
        );

        let handle = PtyHandle::new(pair.master, child, writer, config.program_name());

        Ok(SpawnedPty {
            process: Arc::new(handle),
            reader,
        })
    }
}

//! PTY handle wrapper for portable-pty

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use portable_pty::{Child, ChildKiller, MasterPty, PtySize};
use termlink_utils::{Result, TermlinkError};
use tracing::{debug, trace};

use super::PtyProcess;

/// How often `wait` checks whether the child has exited
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Handle to a running native PTY.
///
/// The child lock is only ever held for a non-blocking check, so a kill is
/// never stuck behind a pending `wait`.
pub struct PtyHandle {
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    writer: Mutex<Box<dyn Write + Send>>,
    /// Basename of the spawned program
    program: String,
}

impl PtyHandle {
    pub(crate) fn new(
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        writer: Box<dyn Write + Send>,
        program: String,
    ) -> Self {
        Self {
            master: Mutex::new(master),
            child: Arc::new(Mutex::new(child)),
            writer: Mutex::new(writer),
            program,
        }
    }

    /// Check if the child process has exited
    pub fn try_wait(&self) -> Result<Option<i32>> {
        let mut child = self.child.lock();
        match child.try_wait() {
            Ok(Some(status)) => Ok(Some(status.exit_code() as i32)),
            Ok(None) => Ok(None),
            Err(e) => Err(TermlinkError::pty(format!("Wait failed: {}", e))),
        }
    }

    #[cfg(target_os = "linux")]
    fn foreground_name(&self) -> Option<String> {
        let pid = self.master.lock().process_group_leader()?;
        let comm = std::fs::read_to_string(format!("/proc/{}/comm", pid)).ok()?;
        let name = comm.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    #[cfg(not(target_os = "linux"))]
    fn foreground_name(&self) -> Option<String> {
        None
    }
}

impl PtyProcess for PtyHandle {
    fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let master = self.master.lock();
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TermlinkError::pty(format!("Resize failed: {}", e)))
    }

    /// Sends SIGHUP, then SIGKILL if the process is still alive after a short
    /// grace period. The escalation runs on its own thread so the caller
    /// returns at once.
    fn kill(&self) -> Result<()> {
        let child = Arc::clone(&self.child);
        std::thread::Builder::new()
            .name(format!("pty-kill-{}", self.program))
            .spawn(move || {
                let mut child = child.lock();
                // Already reaped; the pid may belong to someone else by now
                if let Ok(Some(_)) = child.try_wait() {
                    return;
                }
                match child.kill() {
                    Ok(()) => trace!(pid = ?child.process_id(), "Terminal process killed"),
                    Err(e) => debug!(pid = ?child.process_id(), error = %e, "Kill failed"),
                }
            })
            .map(|_| ())
            .map_err(|e| TermlinkError::pty(format!("Kill failed: {}", e)))
    }

    fn wait(&self) -> Result<i32> {
        loop {
            if let Some(code) = self.try_wait()? {
                return Ok(code);
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn process_name(&self) -> Option<String> {
        self.foreground_name().or_else(|| Some(self.program.clone()))
    }
}

impl std::fmt::Debug for PtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandle")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

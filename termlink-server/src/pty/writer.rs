//! PTY input writer
//!
//! A write to a PTY blocks once the child stops reading and the kernel
//! buffer fills up. Each terminal therefore gets a writer thread fed through
//! a bounded queue, and callers only ever enqueue.

use std::sync::Arc;
use std::thread::JoinHandle;

use termlink_protocol::TerminalId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use super::PtyProcess;

/// Input chunks that may wait for a slow process before new input is dropped
const INPUT_QUEUE_CAPACITY: usize = 256;

/// Enqueues input for a terminal's writer thread
#[derive(Debug, Clone)]
pub struct InputSender {
    terminal_id: TerminalId,
    tx: mpsc::Sender<Vec<u8>>,
}

impl InputSender {
    pub(crate) fn new(terminal_id: TerminalId, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { terminal_id, tx }
    }

    /// Queue bytes for the process without waiting.
    ///
    /// Returns whether the bytes were queued.
    pub fn send(&self, data: Vec<u8>) -> bool {
        match self.tx.try_send(data) {
            Ok(()) => true,
            Err(TrySendError::Full(data)) => {
                warn!(
                    terminal_id = self.terminal_id,
                    bytes = data.len(),
                    "Input queue full, dropping input"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!(terminal_id = self.terminal_id, "Writer gone, dropping input");
                false
            }
        }
    }
}

/// Start the writer thread for a terminal.
///
/// The thread ends when every [`InputSender`] is dropped or a write fails.
pub fn spawn_writer(
    terminal_id: TerminalId,
    process: Arc<dyn PtyProcess>,
) -> std::io::Result<(InputSender, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
    let handle = std::thread::Builder::new()
        .name(format!("pty-writer-{}", terminal_id))
        .spawn(move || run_writer(terminal_id, rx, process))?;
    Ok((InputSender::new(terminal_id, tx), handle))
}

fn run_writer(
    terminal_id: TerminalId,
    mut rx: mpsc::Receiver<Vec<u8>>,
    process: Arc<dyn PtyProcess>,
) {
    while let Some(data) = rx.blocking_recv() {
        if let Err(e) = process.write_all(&data) {
            if e.is_process_gone() {
                debug!(terminal_id, bytes = data.len(), "Terminal gone, stopping writer");
            } else {
                warn!(terminal_id, bytes = data.len(), error = %e, "Input write failed");
            }
            return;
        }
    }
    trace!(terminal_id, "Writer finished");
}

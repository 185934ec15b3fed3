//! PTY output reader
//!
//! Each terminal gets one blocking reader thread. It decodes output as UTF-8
//! and forwards every chunk to the owning connection without buffering; when
//! the connection falls behind, the thread waits and the PTY fills up. At
//! EOF it reaps the process and reports the exit code.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread::JoinHandle;

use termlink_protocol::TerminalId;
use tracing::{debug, trace, warn};

use super::PtyProcess;
use crate::event::{ConnectionEvent, EventSender};

/// Read buffer size for PTY reads
const READ_BUFFER_SIZE: usize = 8192;

/// Exit code reported when the process could not be reaped
const UNKNOWN_EXIT_CODE: i32 = -1;

/// Start the reader thread for a terminal
pub fn spawn_reader(
    terminal_id: TerminalId,
    reader: Box<dyn Read + Send>,
    process: Arc<dyn PtyProcess>,
    events: EventSender,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("pty-reader-{}", terminal_id))
        .spawn(move || run_reader(terminal_id, reader, process, events))
}

fn run_reader(
    terminal_id: TerminalId,
    mut reader: Box<dyn Read + Send>,
    process: Arc<dyn PtyProcess>,
    events: EventSender,
) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut decoder = Utf8Decoder::default();

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                trace!(terminal_id, bytes = n, "PTY output");
                let data = decoder.decode(&buf[..n]);
                if data.is_empty() {
                    continue;
                }
                if events.blocking_send(ConnectionEvent::Output { terminal_id, data }).is_err() {
                    debug!(terminal_id, "Connection gone, stopping reader");
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO is how Linux reports a closed slave side
                trace!(terminal_id, error = %e, "PTY read ended");
                break;
            }
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        let _ = events.blocking_send(ConnectionEvent::Output {
            terminal_id,
            data: tail,
        });
    }

    let exit_code = match process.wait() {
        Ok(code) => code,
        Err(e) => {
            warn!(terminal_id, error = %e, "Failed to reap terminal process");
            UNKNOWN_EXIT_CODE
        }
    };

    debug!(terminal_id, exit_code, "Terminal process exited");
    let _ = events.blocking_send(ConnectionEvent::Exited {
        terminal_id,
        exit_code,
    });
}

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two reads is held back until the
/// rest of it arrives. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub(crate) fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));

                    match error.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is still held back
    pub(crate) fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}

//! Inline command injection
//!
//! A terminal spawned with an inline command gets that command typed into
//! its shell once the shell looks ready: shortly after the first output
//! chunk, or after a fallback delay if the shell stays silent. Whichever
//! trigger fires first wins; the command is written at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use termlink_protocol::TerminalId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::InjectConfig;
use crate::pty::InputSender;

/// Build the command line for `program` with `args` as one quoted argument
pub fn build_command(program: &str, args: &str) -> String {
    format!("{} {}", program, quote_arg(args))
}

/// POSIX shells: close the quote, emit an escaped quote, reopen
#[cfg(not(windows))]
fn quote_arg(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// PowerShell: a doubled single quote is a literal quote
#[cfg(windows)]
fn quote_arg(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "''"))
}

/// Types an inline command into a shell exactly once
pub struct CommandInjector {
    terminal_id: TerminalId,
    command: Arc<str>,
    input: InputSender,
    fired: Arc<AtomicBool>,
    token: CancellationToken,
    prompt_delay: Duration,
    prompt_armed: bool,
}

impl CommandInjector {
    /// Arm the fallback timer. Cancelling `parent` cancels both timers.
    pub fn start(
        terminal_id: TerminalId,
        command: String,
        input: InputSender,
        config: &InjectConfig,
        parent: &CancellationToken,
    ) -> Self {
        let injector = Self {
            terminal_id,
            command: command.into(),
            input,
            fired: Arc::new(AtomicBool::new(false)),
            token: parent.child_token(),
            prompt_delay: config.prompt_delay(),
            prompt_armed: false,
        };
        injector.schedule(config.fallback_delay());
        injector
    }

    /// Called for every output chunk; arms the prompt timer on the first one
    pub fn on_output(&mut self) {
        if self.prompt_armed || self.has_fired() {
            return;
        }
        self.prompt_armed = true;
        self.schedule(self.prompt_delay);
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Stop any pending trigger
    pub fn cancel(&self) {
        self.token.cancel();
    }

    fn schedule(&self, delay: Duration) {
        let terminal_id = self.terminal_id;
        let command = Arc::clone(&self.command);
        let input = self.input.clone();
        let fired = Arc::clone(&self.fired);
        let token = self.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    fire(terminal_id, &command, &input, &fired);
                    // The other trigger has nothing left to do
                    token.cancel();
                }
            }
        });
    }
}

impl Drop for CommandInjector {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn fire(terminal_id: TerminalId, command: &str, input: &InputSender, fired: &AtomicBool) {
    if fired.swap(true, Ordering::SeqCst) {
        return;
    }

    info!(terminal_id, bytes = command.len(), "Injecting inline command");
    if !input.send(format!("{}\r", command).into_bytes()) {
        debug!(terminal_id, "Inline command not queued");
    }
}

//! A single terminal session

use std::sync::Arc;
use std::time::Duration;

use termlink_protocol::{Dimensions, TerminalId};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use super::Debouncer;
use crate::config::AppConfig;
use crate::event::{ConnectionEvent, EventSender};
use crate::inject::CommandInjector;
use crate::pty::{InputSender, PtyProcess};
use crate::spawn::SpawnParams;

/// One live shell and its timers.
///
/// Owned by a connection. Timers are tied to a single cancellation token,
/// cancelled when the session is shut down or dropped.
pub struct TerminalSession {
    id: TerminalId,
    process: Arc<dyn PtyProcess>,
    input: InputSender,
    token: CancellationToken,
    resize: Debouncer<Dimensions>,
    title_poll: Option<JoinHandle<()>>,
    last_title: String,
    custom_title: bool,
    injector: Option<CommandInjector>,
}

impl TerminalSession {
    /// Wrap a spawned process and start its timers
    pub fn start(
        id: TerminalId,
        process: Arc<dyn PtyProcess>,
        input: InputSender,
        params: &SpawnParams,
        config: &AppConfig,
        events: EventSender,
    ) -> Self {
        let token = CancellationToken::new();

        let resize = {
            let process = Arc::clone(&process);
            Debouncer::new(config.terminal.resize_debounce(), move |dims: Dimensions| {
                match process.resize(dims.cols, dims.rows) {
                    Ok(()) => trace!(terminal_id = id, cols = dims.cols, rows = dims.rows, "Resized"),
                    Err(e) if e.is_process_gone() => trace!(terminal_id = id, "Resize after exit"),
                    Err(e) => warn!(terminal_id = id, error = %e, "Resize failed"),
                }
            })
        };

        let title_poll = (!params.custom_title).then(|| {
            spawn_title_poll(
                id,
                config.terminal.title_poll_interval(),
                token.clone(),
                events,
            )
        });

        let injector = params.inline_command.clone().map(|command| {
            CommandInjector::start(id, command, input.clone(), &config.inject, &token)
        });

        Self {
            id,
            process,
            input,
            token,
            resize,
            title_poll,
            last_title: params.title.clone(),
            custom_title: params.custom_title,
            injector,
        }
    }

    pub fn has_custom_title(&self) -> bool {
        self.custom_title
    }

    pub fn is_polling_title(&self) -> bool {
        self.title_poll
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Queue client input verbatim; the write happens off the event loop
    pub fn write_input(&self, data: &str) {
        self.input.send(data.as_bytes().to_vec());
    }

    /// Request a resize; out-of-range sizes are ignored.
    ///
    /// Returns whether the request was accepted for debouncing.
    pub fn resize(&mut self, cols: u32, rows: u32) -> bool {
        match Dimensions::checked(cols, rows) {
            Some(dims) => {
                self.resize.call(dims);
                true
            }
            None => {
                trace!(terminal_id = self.id, cols, rows, "Ignoring out-of-range resize");
                false
            }
        }
    }

    /// Record that the shell produced output
    pub fn note_output(&mut self) {
        if let Some(injector) = self.injector.as_mut() {
            injector.on_output();
        }
    }

    /// Check the foreground process name, returning it if it changed
    pub fn poll_title(&mut self) -> Option<String> {
        if self.custom_title {
            return None;
        }

        let name = self.process.process_name()?;
        if name == self.last_title {
            return None;
        }

        self.last_title.clone_from(&name);
        Some(name)
    }

    /// Tear the session down, optionally killing the process
    pub fn shutdown(mut self, kill: bool) {
        self.cancel_timers();

        if kill {
            if let Err(e) = self.process.kill() {
                debug!(terminal_id = self.id, error = %e, "Kill failed");
            }
        }
    }

    fn cancel_timers(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.resize.cancel();
        if let Some(injector) = &self.injector {
            injector.cancel();
        }
        trace!(terminal_id = self.id, "Session timers cancelled");
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn spawn_title_poll(
    terminal_id: TerminalId,
    period: Duration,
    token: CancellationToken,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    // A tick skipped while the connection is busy is picked up by the next one
                    if let Err(TrySendError::Closed(_)) =
                        events.try_send(ConnectionEvent::TitleTick { terminal_id })
                    {
                        break;
                    }
                }
            }
        }
    })
}

//! Per-socket connection state
//!
//! A [`Connection`] owns every terminal spawned over one socket. Inbound
//! client messages and terminal events are both applied from the socket's
//! event loop, so the session map needs no lock. Outbound messages wait for
//! room in the socket queue, which holds terminal output back from a slow
//! client.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use termlink_protocol::{utf16_len, ClientMessage, ServerMessage, SpawnRequest, TerminalId, MAX_INPUT_LEN};
use termlink_utils::TermlinkError;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::event::{event_channel, ConnectionEvent, EventReceiver, EventSender};
use crate::pty::{spawn_reader, spawn_writer, PtyBackend};
use crate::session::TerminalSession;
use crate::spawn::{self, SpawnError};

/// Terminal state for one socket
pub struct Connection {
    id: Uuid,
    backend: Arc<dyn PtyBackend>,
    config: Arc<AppConfig>,
    sessions: HashMap<TerminalId, TerminalSession>,
    next_terminal_id: TerminalId,
    outbound: mpsc::Sender<ServerMessage>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    closed: bool,
}

impl Connection {
    pub fn new(
        id: Uuid,
        backend: Arc<dyn PtyBackend>,
        config: Arc<AppConfig>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Self {
        let (events_tx, events_rx) = event_channel();
        Self {
            id,
            backend,
            config,
            sessions: HashMap::new(),
            next_terminal_id: 1,
            outbound,
            events_tx,
            events_rx,
            closed: false,
        }
    }

    /// Number of live terminals
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn has_session(&self, terminal_id: TerminalId) -> bool {
        self.sessions.contains_key(&terminal_id)
    }

    /// Handle a raw text frame; anything unparseable is dropped
    pub async fn handle_text(&mut self, text: &str) {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                debug!(connection_id = %self.id, bytes = text.len(), error = %e, "Dropping malformed message");
            }
        }
    }

    /// Route a client message
    pub async fn handle_message(&mut self, msg: ClientMessage) {
        trace!(connection_id = %self.id, kind = msg.kind(), terminal_id = ?msg.terminal_id(), "Client message");

        match msg {
            ClientMessage::Spawn(request) => self.handle_spawn(request).await,
            ClientMessage::Input { terminal_id, data } => self.handle_input(terminal_id, &data),
            ClientMessage::Resize {
                terminal_id,
                cols,
                rows,
            } => {
                if let Some(session) = self.sessions.get_mut(&terminal_id) {
                    session.resize(cols, rows);
                }
            }
            ClientMessage::Kill { terminal_id } => self.handle_kill(terminal_id),
        }
    }

    /// Wait for the next terminal event
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events_rx.recv().await
    }

    /// Apply a terminal event; events for terminals no longer live are dropped
    pub async fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Output { terminal_id, data } => {
                let Some(session) = self.sessions.get_mut(&terminal_id) else {
                    return;
                };
                session.note_output();
                self.send(ServerMessage::Output { terminal_id, data }).await;
            }
            ConnectionEvent::Exited {
                terminal_id,
                exit_code,
            } => {
                let Some(session) = self.sessions.remove(&terminal_id) else {
                    return;
                };
                session.shutdown(false);
                info!(connection_id = %self.id, terminal_id, exit_code, "Terminal exited");
                self.send(ServerMessage::Exit {
                    terminal_id,
                    exit_code,
                })
                .await;
            }
            ConnectionEvent::TitleTick { terminal_id } => {
                let title = self
                    .sessions
                    .get_mut(&terminal_id)
                    .and_then(TerminalSession::poll_title);
                if let Some(title) = title {
                    debug!(connection_id = %self.id, terminal_id, title = %title, "Title changed");
                    self.send(ServerMessage::Title { terminal_id, title }).await;
                }
            }
        }
    }

    /// Kill every terminal. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.shutdown(true);
        }
        info!(connection_id = %self.id, terminals = count, "Connection closed");
    }

    async fn handle_spawn(&mut self, request: SpawnRequest) {
        let correlation_id = request.correlation_id.clone();

        let reply = match self.spawn(&request) {
            Ok((terminal_id, title)) => ServerMessage::Spawned {
                terminal_id,
                title,
                correlation_id,
            },
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "Spawn rejected");
                ServerMessage::error(e.to_string(), correlation_id)
            }
        };
        self.send(reply).await;
    }

    fn spawn(&mut self, request: &SpawnRequest) -> Result<(TerminalId, String), SpawnError> {
        if self.closed {
            return Err(TermlinkError::internal("connection closed").into());
        }

        let params = spawn::validate(request, self.sessions.len(), &self.config)?;
        let spawned = self.backend.spawn(&params.pty)?;

        let terminal_id = self.next_terminal_id;
        self.next_terminal_id = self.next_terminal_id.wrapping_add(1).max(1);

        let process = Arc::clone(&spawned.process);
        let (input, _writer) = match spawn_writer(terminal_id, Arc::clone(&process)) {
            Ok(writer) => writer,
            Err(e) => {
                let _ = process.kill();
                return Err(TermlinkError::Io(e).into());
            }
        };
        if let Err(e) = spawn_reader(
            terminal_id,
            spawned.reader,
            Arc::clone(&process),
            self.events_tx.clone(),
        ) {
            let _ = process.kill();
            return Err(TermlinkError::Io(e).into());
        }

        let session = TerminalSession::start(
            terminal_id,
            process,
            input,
            &params,
            &self.config,
            self.events_tx.clone(),
        );
        self.sessions.insert(terminal_id, session);

        info!(
            connection_id = %self.id,
            terminal_id,
            shell = %params.pty.command,
            cwd = ?params.pty.cwd,
            cols = params.pty.size.cols,
            rows = params.pty.size.rows,
            inline_command = params.inline_command.is_some(),
            "Terminal spawned"
        );

        Ok((terminal_id, params.title))
    }

    fn handle_input(&mut self, terminal_id: TerminalId, data: &str) {
        if utf16_len(data) > MAX_INPUT_LEN {
            debug!(connection_id = %self.id, terminal_id, bytes = data.len(), "Dropping oversize input");
            return;
        }
        if let Some(session) = self.sessions.get(&terminal_id) {
            session.write_input(data);
        }
    }

    fn handle_kill(&mut self, terminal_id: TerminalId) {
        if let Some(session) = self.sessions.remove(&terminal_id) {
            session.shutdown(true);
            info!(connection_id = %self.id, terminal_id, "Terminal killed");
        }
    }

    /// Queue a message for the socket, waiting while the queue is full.
    ///
    /// The returned future does not borrow the connection.
    fn send(&self, msg: ServerMessage) -> impl Future<Output = ()> + Send + 'static {
        let outbound = self.outbound.clone();
        let connection_id = self.id;
        async move {
            if outbound.send(msg).await.is_err() {
                trace!(%connection_id, "Outbound channel closed");
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

//! Events delivered to a connection's event loop

use termlink_protocol::TerminalId;
use tokio::sync::mpsc;

/// Events that may queue up before reader threads wait on the connection.
///
/// A full queue stalls the PTY reads, which in turn stalls the shell.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something happened to one of a connection's terminals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A decoded chunk of terminal output
    Output { terminal_id: TerminalId, data: String },
    /// The shell process ended
    Exited { terminal_id: TerminalId, exit_code: i32 },
    /// Time to check the terminal's foreground process name
    TitleTick { terminal_id: TerminalId },
}

pub type EventSender = mpsc::Sender<ConnectionEvent>;
pub type EventReceiver = mpsc::Receiver<ConnectionEvent>;

/// Create a connection's event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

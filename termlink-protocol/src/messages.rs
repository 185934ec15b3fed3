//! Client-server message types
//!
//! Messages travel as JSON text frames. Every message carries a `type` tag
//! and camelCase field names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TerminalId;

/// Request to start a new shell.
///
/// Every field is kept loosely typed so that one badly typed optional field
/// never makes the whole request unreadable. Dimensions may be numbers,
/// numeric strings or absent, and the server clamps whatever arrives; the
/// string fields are checked by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Value>,
    /// Inline command typed into the shell once it is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_args: Option<Value>,
    /// Caller-supplied display title; disables title polling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    /// Opaque token echoed back on the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Value>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Spawn(SpawnRequest),
    Input { terminal_id: TerminalId, data: String },
    Resize { terminal_id: TerminalId, cols: u32, rows: u32 },
    Kill { terminal_id: TerminalId },
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Terminal the message addresses, if any
    pub fn terminal_id(&self) -> Option<TerminalId> {
        match self {
            Self::Spawn(_) => None,
            Self::Input { terminal_id, .. }
            | Self::Resize { terminal_id, .. }
            | Self::Kill { terminal_id } => Some(*terminal_id),
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn(_) => "spawn",
            Self::Input { .. } => "input",
            Self::Resize { .. } => "resize",
            Self::Kill { .. } => "kill",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Spawn succeeded
    Spawned {
        terminal_id: TerminalId,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<Value>,
    },
    /// Output from the shell
    Output { terminal_id: TerminalId, data: String },
    /// Foreground process name changed
    Title { terminal_id: TerminalId, title: String },
    /// Shell process ended
    Exit { terminal_id: TerminalId, exit_code: i32 },
    /// Spawn rejected or PTY allocation failed
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<Value>,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>, correlation_id: Option<Value>) -> Self {
        Self::Error {
            message: message.into(),
            correlation_id,
        }
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

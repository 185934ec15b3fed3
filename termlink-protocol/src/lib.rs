//! termlink-protocol: Message definitions for the terminal socket
//!
//! This crate defines the JSON messages exchanged between a browser client
//! and the termlink server, plus the dimension and size limits both sides
//! agree on.

pub mod messages;
pub mod types;

pub use messages::{ClientMessage, ServerMessage, SpawnRequest};
pub use types::{
    utf16_len, Dimensions, TerminalId, DEFAULT_COLS, DEFAULT_ROWS, MAX_COLS, MAX_INLINE_COMMAND_LEN,
    MAX_INPUT_LEN, MAX_ROWS, MIN_COLS, MIN_ROWS,
};

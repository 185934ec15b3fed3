//! termlink-server: Interactive shells over a WebSocket
//!
//! Spawns real shells in pseudo-terminals and multiplexes many of them over
//! one socket connection, relaying keystrokes in and output, title and exit
//! events out.

pub mod config;
pub mod connection;
pub mod event;
pub mod inject;
pub mod pty;
pub mod server;
pub mod session;
pub mod spawn;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, ConfigLoader};
pub use connection::Connection;
pub use pty::{NativePtyBackend, PtyBackend};
pub use spawn::SpawnError;

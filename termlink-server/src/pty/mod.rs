//! PTY management for termlink server
//!
//! Provides pseudo-terminal creation plus the reader and writer threads
//! around each one, using portable-pty for cross-platform compatibility.

mod backend;
mod config;
mod handle;
mod reader;
mod writer;

pub use backend::{NativePtyBackend, PtyBackend, PtyProcess, SpawnedPty};
pub use config::{program_basename, PtyConfig};
pub use handle::PtyHandle;
pub use reader::spawn_reader;
pub use writer::{spawn_writer, InputSender};

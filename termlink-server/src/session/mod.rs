//! Terminal sessions
//!
//! A session owns one running shell plus the timers that act on it.

mod debounce;
mod terminal;

pub use debounce::Debouncer;
pub use terminal::TerminalSession;

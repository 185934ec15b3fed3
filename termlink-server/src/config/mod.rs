//! Server configuration

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{AppConfig, InjectConfig, ServerConfig, TerminalConfig};

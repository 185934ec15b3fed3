//! Configuration schema structs

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub terminal: TerminalConfig,
    pub inject: InjectConfig,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub bind_addr: String,
    /// Route the terminal socket is served on
    pub ws_path: String,
    /// Browser origins accepted in addition to loopback origins
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7681".into(),
            ws_path: "/ws/terminal".into(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Terminal session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell to spawn instead of the platform default
    pub default_shell: Option<String>,
    /// Working directory used when a spawn request names none
    pub default_cwd: Option<PathBuf>,
    /// Maximum live terminals per connection
    pub max_sessions: usize,
    /// Interval between foreground process name checks
    pub title_poll_interval_ms: u64,
    /// Quiet period before a resize is applied
    pub resize_debounce_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            default_shell: None,
            default_cwd: None,
            max_sessions: 10,
            title_poll_interval_ms: 2000,
            resize_debounce_ms: 50,
        }
    }
}

impl TerminalConfig {
    pub fn title_poll_interval(&self) -> Duration {
        Duration::from_millis(self.title_poll_interval_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

/// Inline command injection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InjectConfig {
    /// Program the inline command is passed to
    pub program: String,
    /// Delay after the first output chunk before typing the command
    pub prompt_delay_ms: u64,
    /// Delay after spawn before typing the command if no output arrived
    pub fallback_delay_ms: u64,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            program: "claude".into(),
            prompt_delay_ms: 100,
            fallback_delay_ms: 1000,
        }
    }
}

impl InjectConfig {
    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

//! PTY configuration types

use std::collections::HashMap;
use std::path::PathBuf;

use termlink_protocol::Dimensions;

/// Configuration for spawning a PTY
#[derive(Debug, Clone, PartialEq)]
pub struct PtyConfig {
    /// Program to execute
    pub command: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Environment variables to set on top of the inherited environment
    pub env: HashMap<String, String>,
    /// Initial terminal size
    pub size: Dimensions,
}

impl PtyConfig {
    /// Create config for a specific command
    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            command: cmd.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            size: Dimensions::default(),
        }
    }

    /// Set working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set initial size
    pub fn with_size(mut self, size: Dimensions) -> Self {
        self.size = size;
        self
    }

    /// Add argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Final path component of the program, used as a display title
    pub fn program_name(&self) -> String {
        program_basename(&self.command)
    }
}

/// Strip directories and a Windows executable suffix from a program path
pub fn program_basename(command: &str) -> String {
    let name = command
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(command);

    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".exe") {
        name[..name.len() - 4].to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PtyConfig::command("bash")
            .with_cwd("/home/user")
            .with_env("TERM", "xterm-256color")
            .with_size(Dimensions::new(120, 40))
            .with_arg("-l");

        assert_eq!(config.command, "bash");
        assert_eq!(config.cwd, Some(PathBuf::from("/home/user")));
        assert_eq!(config.env.get("TERM").map(String::as_str), Some("xterm-256color"));
        assert_eq!(config.size, Dimensions::new(120, 40));
        assert_eq!(config.args, vec!["-l"]);
    }

    #[test]
    fn test_default_size() {
        assert_eq!(PtyConfig::command("sh").size, Dimensions::new(80, 24));
    }

    #[test]
    fn test_program_basename() {
        assert_eq!(program_basename("/bin/bash"), "bash");
        assert_eq!(program_basename("/usr/local/bin/zsh"), "zsh");
        assert_eq!(program_basename("fish"), "fish");
        assert_eq!(program_basename("powershell.exe"), "powershell");
        assert_eq!(
            program_basename(r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.EXE"),
            "powershell"
        );
    }
}

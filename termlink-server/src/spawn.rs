//! Spawn request validation
//!
//! Turns a loosely typed [`SpawnRequest`] into a [`PtyConfig`] plus the
//! session options that go with it. Nothing here touches a PTY: every
//! rejection happens before a process exists.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;

use termlink_protocol::{utf16_len, Dimensions, SpawnRequest, MAX_INLINE_COMMAND_LEN};
use termlink_utils::{home_dir, user_bin_dir, TermlinkError};

use crate::config::{AppConfig, TerminalConfig};
use crate::inject::build_command;
use crate::pty::{program_basename, PtyConfig};

/// Why a spawn request was rejected.
///
/// The display strings are sent to the client verbatim.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("Maximum terminal limit reached")]
    LimitReached,

    #[error("Working directory must be a string")]
    CwdNotString,

    #[error("UNC paths are not allowed as working directory")]
    UncPath,

    #[error("Working directory does not exist: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Working directory is not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("Working directory is not accessible: {}: {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to spawn terminal: {0}")]
    Allocation(#[from] TermlinkError),
}

/// Everything needed to start a validated terminal
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnParams {
    pub pty: PtyConfig,
    /// Title reported in the `spawned` response
    pub title: String,
    /// Whether `title` came from the caller
    pub custom_title: bool,
    /// Fully built command line to type once the shell is ready
    pub inline_command: Option<String>,
}

/// Validate a spawn request against the connection's current load
pub fn validate(
    request: &SpawnRequest,
    live_sessions: usize,
    config: &AppConfig,
) -> Result<SpawnParams, SpawnError> {
    if live_sessions >= config.terminal.max_sessions {
        return Err(SpawnError::LimitReached);
    }

    let requested_cwd = match &request.cwd {
        None => None,
        Some(Value::String(cwd)) => Some(cwd.as_str()),
        Some(_) => return Err(SpawnError::CwdNotString),
    };
    let cwd = resolve_cwd(requested_cwd, &config.terminal)?;
    let size = Dimensions::clamped(request.cols.as_ref(), request.rows.as_ref());
    let shell = default_shell(&config.terminal);

    let mut pty = PtyConfig::command(&shell)
        .with_cwd(cwd)
        .with_size(size)
        .with_env("TERM", "xterm-256color")
        .with_env("COLORTERM", "truecolor");

    if let Some(path) = augmented_path(std::env::var_os("PATH"), &user_bin_dir()) {
        pty = pty.with_env("PATH", path);
    }

    // A non-string inline command or title is treated as absent
    let inline_command = request
        .claude_args
        .as_ref()
        .and_then(Value::as_str)
        .filter(|args| is_valid_inline_command(args))
        .map(|args| build_command(&config.inject.program, args));

    let title = request.title.as_ref().and_then(Value::as_str);
    let (title, custom_title) = match title.filter(|t| !t.is_empty()) {
        Some(title) => (title.to_string(), true),
        None => (program_basename(&shell), false),
    };

    Ok(SpawnParams {
        pty,
        title,
        custom_title,
        inline_command,
    })
}

/// Network share paths like `\\server\share` or `//server/share`
pub fn is_unc_path(path: &str) -> bool {
    path.starts_with(r"\\") || path.starts_with("//")
}

fn resolve_cwd(requested: Option<&str>, config: &TerminalConfig) -> Result<PathBuf, SpawnError> {
    let requested = requested.filter(|p| !p.is_empty());

    // Checked before any filesystem access so no share is ever contacted
    if requested.is_some_and(is_unc_path) {
        return Err(SpawnError::UncPath);
    }

    let path = match requested {
        Some(p) => PathBuf::from(p),
        None => config.default_cwd.clone().unwrap_or_else(home_dir),
    };
    let path = absolutize(&path);

    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Ok(path),
        Ok(_) => Err(SpawnError::NotADirectory { path }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SpawnError::NotFound { path }),
        Err(source) => Err(SpawnError::Inaccessible { path, source }),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| home_dir())
        .join(path)
}

/// Shell used for new terminals
pub fn default_shell(config: &TerminalConfig) -> String {
    config
        .default_shell
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_else(platform_shell)
}

#[cfg(windows)]
fn platform_shell() -> String {
    "powershell.exe".into()
}

#[cfg(not(windows))]
fn platform_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".into())
}

/// Prepend `extra` to a PATH value unless it is already listed.
///
/// Returns `None` when the result cannot be represented as a string, in
/// which case the inherited PATH is left alone.
pub fn augmented_path(current: Option<OsString>, extra: &Path) -> Option<String> {
    let mut entries: Vec<PathBuf> = current
        .as_deref()
        .map(|p| std::env::split_paths(p).filter(|e| !e.as_os_str().is_empty()).collect())
        .unwrap_or_default();

    if !entries.iter().any(|e| e == extra) {
        entries.insert(0, extra.to_path_buf());
    }

    std::env::join_paths(entries).ok()?.into_string().ok()
}

fn is_valid_inline_command(args: &str) -> bool {
    !args.is_empty() && utf16_len(args) <= MAX_INLINE_COMMAND_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn request_in(dir: &Path) -> SpawnRequest {
        SpawnRequest {
            cwd: Some(json!(dir.to_string_lossy())),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request() {
        let dir = tempdir().unwrap();
        let mut request = request_in(dir.path());
        request.cols = Some(json!(100));
        request.rows = Some(json!(30));

        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(params.pty.cwd.as_deref(), Some(dir.path()));
        assert_eq!(params.pty.size, Dimensions::new(100, 30));
        assert_eq!(params.pty.env.get("TERM").map(String::as_str), Some("xterm-256color"));
        assert_eq!(params.pty.env.get("COLORTERM").map(String::as_str), Some("truecolor"));
        assert!(!params.custom_title);
        assert_eq!(params.title, program_basename(&params.pty.command));
        assert_eq!(params.inline_command, None);
    }

    #[test]
    fn test_limit_reached() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default();

        let err = validate(&request_in(dir.path()), 10, &config).unwrap_err();
        assert!(matches!(err, SpawnError::LimitReached));
        assert_eq!(err.to_string(), "Maximum terminal limit reached");

        assert!(validate(&request_in(dir.path()), 9, &config).is_ok());
    }

    #[test]
    fn test_missing_cwd() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = validate(&request_in(&missing), 0, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, SpawnError::NotFound { .. }));
        assert!(err.to_string().starts_with("Working directory does not exist"));
    }

    #[test]
    fn test_cwd_is_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "x").unwrap();

        let err = validate(&request_in(&file), 0, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, SpawnError::NotADirectory { .. }));
    }

    #[test]
    fn test_unc_cwd_rejected() {
        for cwd in [r"\\fileserver\share", "//fileserver/share"] {
            let request = SpawnRequest {
                cwd: Some(json!(cwd)),
                ..Default::default()
            };
            let err = validate(&request, 0, &AppConfig::default()).unwrap_err();
            assert!(matches!(err, SpawnError::UncPath), "{} should be rejected", cwd);
        }
    }

    #[test]
    fn test_non_string_cwd_rejected() {
        for cwd in [json!(5), json!(["/tmp"]), json!({"path": "/tmp"})] {
            let request = SpawnRequest {
                cwd: Some(cwd),
                ..Default::default()
            };
            let err = validate(&request, 0, &AppConfig::default()).unwrap_err();
            assert!(matches!(err, SpawnError::CwdNotString));
        }
    }

    #[test]
    fn test_errors_have_distinct_messages() {
        let messages = [
            SpawnError::LimitReached.to_string(),
            SpawnError::CwdNotString.to_string(),
            SpawnError::UncPath.to_string(),
            SpawnError::NotFound { path: "/x".into() }.to_string(),
            SpawnError::NotADirectory { path: "/x".into() }.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_missing_cwd_uses_configured_default() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.terminal.default_cwd = Some(dir.path().to_path_buf());

        let params = validate(&SpawnRequest::default(), 0, &config).unwrap();
        assert_eq!(params.pty.cwd.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_dimensions_clamped() {
        let dir = tempdir().unwrap();
        let mut request = request_in(dir.path());
        request.cols = Some(json!(10_000));
        request.rows = Some(json!("abc"));

        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(params.pty.size, Dimensions::new(500, 24));
    }

    #[test]
    fn test_custom_title() {
        let dir = tempdir().unwrap();
        let mut request = request_in(dir.path());
        request.title = Some(json!("Deploy"));

        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(params.title, "Deploy");
        assert!(params.custom_title);

        request.title = Some(json!(""));
        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert!(!params.custom_title);

        request.title = Some(json!(7));
        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert!(!params.custom_title);
        assert_eq!(params.title, program_basename(&params.pty.command));
    }

    #[test]
    fn test_configured_shell() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.terminal.default_shell = Some("/usr/bin/fish".into());

        let params = validate(&request_in(dir.path()), 0, &config).unwrap();
        assert_eq!(params.pty.command, "/usr/bin/fish");
        assert_eq!(params.title, "fish");
    }

    #[test]
    fn test_inline_command_built() {
        let dir = tempdir().unwrap();
        let mut request = request_in(dir.path());
        request.claude_args = Some(json!("fix the tests"));

        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(
            params.inline_command.as_deref(),
            Some(build_command("claude", "fix the tests").as_str())
        );
    }

    #[test]
    fn test_inline_command_ignored_when_invalid() {
        let dir = tempdir().unwrap();
        let mut request = request_in(dir.path());

        request.claude_args = Some(json!(""));
        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(params.inline_command, None);

        request.claude_args = Some(json!("x".repeat(MAX_INLINE_COMMAND_LEN + 1)));
        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(params.inline_command, None);

        request.claude_args = Some(json!(123));
        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert_eq!(params.inline_command, None);

        request.claude_args = Some(json!("x".repeat(MAX_INLINE_COMMAND_LEN)));
        let params = validate(&request, 0, &AppConfig::default()).unwrap();
        assert!(params.inline_command.is_some());
    }

    #[test]
    fn test_augmented_path_prepends_once() {
        let extra = PathBuf::from("/home/u/.local/bin");
        let current = std::env::join_paths(["/usr/bin", "/bin"]).unwrap();

        let path = augmented_path(Some(current), &extra).unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(entries[0], extra);
        assert_eq!(entries.len(), 3);

        let again = augmented_path(Some(path.clone().into()), &extra).unwrap();
        assert_eq!(again, path);
    }

    #[test]
    fn test_augmented_path_without_path() {
        let extra = PathBuf::from("/home/u/.local/bin");
        let path = augmented_path(None, &extra).unwrap();
        assert_eq!(PathBuf::from(path), extra);
    }

    #[test]
    fn test_is_unc_path() {
        assert!(is_unc_path(r"\\server\share\dir"));
        assert!(is_unc_path("//server/share"));
        assert!(!is_unc_path("/tmp"));
        assert!(!is_unc_path(r"C:\Users"));
    }
}

//! Shared value types and wire limits

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a terminal, unique within one connection
pub type TerminalId = u32;

/// Smallest accepted column count
pub const MIN_COLS: u16 = 1;
/// Largest accepted column count
pub const MAX_COLS: u16 = 500;
/// Smallest accepted row count
pub const MIN_ROWS: u16 = 1;
/// Largest accepted row count
pub const MAX_ROWS: u16 = 200;
/// Column count used when a spawn request gives none
pub const DEFAULT_COLS: u16 = 80;
/// Row count used when a spawn request gives none
pub const DEFAULT_ROWS: u16 = 24;

/// Maximum length of a single `input` payload, in UTF-16 code units
pub const MAX_INPUT_LEN: usize = 65_536;
/// Maximum length of an inline command, in UTF-16 code units
pub const MAX_INLINE_COMMAND_LEN: usize = 10_000;

/// Length of a string in UTF-16 code units.
///
/// Browser clients measure string lengths this way, so the wire limits are
/// expressed in the same unit.
pub fn utf16_len(s: &str) -> usize {
    // Each ASCII byte is exactly one UTF-16 code unit
    if s.is_ascii() {
        return s.len();
    }
    s.encode_utf16().count()
}

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub cols: u16,
    pub rows: u16,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

impl Dimensions {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Build dimensions from loosely typed request values.
    ///
    /// Numbers and numeric strings are truncated and clamped into range;
    /// anything else (absent, null, non-numeric) falls back to 80x24 per axis.
    pub fn clamped(cols: Option<&Value>, rows: Option<&Value>) -> Self {
        Self {
            cols: clamp_axis(cols, MIN_COLS, MAX_COLS, DEFAULT_COLS),
            rows: clamp_axis(rows, MIN_ROWS, MAX_ROWS, DEFAULT_ROWS),
        }
    }

    /// Accept dimensions only if both axes are within bounds
    pub fn checked(cols: u32, rows: u32) -> Option<Self> {
        let cols = u16::try_from(cols).ok()?;
        let rows = u16::try_from(rows).ok()?;
        if (MIN_COLS..=MAX_COLS).contains(&cols) && (MIN_ROWS..=MAX_ROWS).contains(&rows) {
            Some(Self { cols, rows })
        } else {
            None
        }
    }
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn clamp_axis(value: Option<&Value>, min: u16, max: u16, default: u16) -> u16 {
    match numeric(value) {
        Some(v) if v.is_finite() => v.trunc().clamp(f64::from(min), f64::from(max)) as u16,
        _ => default,
    }
}

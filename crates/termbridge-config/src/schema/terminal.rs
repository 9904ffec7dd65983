//! Pseudo-terminal geometry and type.

use serde::{Deserialize, Serialize};

/// Initial PTY settings for every spawned session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Initial columns (valid range: 1-1000).
    pub cols: u32,
    /// Initial rows (valid range: 1-1000).
    pub rows: u32,
    /// Value exported as `TERM` to the shell.
    pub term: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 30,
            term: "xterm-color".into(),
        }
    }
}

//! Supervisor value types: geometry, spawn options, exit and termination.

use std::path::PathBuf;

use portable_pty::PtySize;
use serde::{Deserialize, Serialize};

use crate::error::PtyError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Maximum bytes read from a PTY in a single call (8 KB).
pub const PTY_READ_CHUNK: usize = 8_192;

/// Default depth, in chunks, of the input and output channels.
pub const DEFAULT_CHANNEL_DEPTH: usize = 64;

/// Default terminal columns.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal rows.
pub const DEFAULT_ROWS: u16 = 30;

/// Default `TERM` exported to the child.
pub const DEFAULT_TERM: &str = "xterm-color";

// =============================================================================
// GEOMETRY
// =============================================================================

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Geometry {
    /// Build a geometry, rejecting zero-sized dimensions.
    pub fn new(cols: u16, rows: u16) -> Result<Self, PtyError> {
        if cols == 0 || rows == 0 {
            return Err(PtyError::InvalidGeometry { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    pub(crate) fn to_pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

// =============================================================================
// SPAWN OPTIONS
// =============================================================================

/// Everything needed to start one PTY-backed process.
///
/// Nothing is inherited implicitly: the caller decides whether the current
/// environment is passed through (`inherit_env`) and where the process starts.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub program: String,
    pub args: Vec<String>,
    pub geometry: Geometry,
    /// Working directory. `None` leaves the choice to the PTY library.
    pub working_dir: Option<PathBuf>,
    /// Variables applied after the (optional) inherited environment.
    pub env: Vec<(String, String)>,
    pub inherit_env: bool,
    /// Start `program` as a login shell. `args` are ignored. Unix only.
    pub login: bool,
    /// Exported as `TERM`.
    pub term: String,
    /// Output channel depth in chunks.
    pub output_depth: usize,
    /// Input channel depth in chunks.
    pub input_depth: usize,
}

impl SpawnOptions {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            geometry: Geometry::default(),
            working_dir: None,
            env: Vec::new(),
            inherit_env: false,
            login: false,
            term: DEFAULT_TERM.to_string(),
            output_depth: DEFAULT_CHANNEL_DEPTH,
            input_depth: DEFAULT_CHANNEL_DEPTH,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    pub fn login(mut self, login: bool) -> Self {
        self.login = login;
        self
    }

    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    /// Set both channel depths. Zero is clamped to one.
    pub fn channel_depths(mut self, output: usize, input: usize) -> Self {
        self.output_depth = output.max(1);
        self.input_depth = input.max(1);
        self
    }
}

// =============================================================================
// EXIT / TERMINATION
// =============================================================================

/// Exit status of a reaped process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: u32,
}

/// How a call to `terminate` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process was gone already, or left within the grace period.
    Exited(Option<ProcessExit>),
    /// The grace period expired and the process was force-killed.
    Killed,
    /// `terminate` had already run for this process.
    AlreadyTerminated,
}

/// Signals a client may ask to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessSignal {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
    Kill,
}

impl ProcessSignal {
    pub fn name(self) -> &'static str {
        match self {
            ProcessSignal::Interrupt => "SIGINT",
            ProcessSignal::Terminate => "SIGTERM",
            ProcessSignal::Hangup => "SIGHUP",
            ProcessSignal::Quit => "SIGQUIT",
            ProcessSignal::Kill => "SIGKILL",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_rejects_zero() {
        assert!(matches!(
            Geometry::new(0, 30),
            Err(PtyError::InvalidGeometry { cols: 0, rows: 30 })
        ));
        assert!(Geometry::new(80, 0).is_err());
        assert_eq!(Geometry::new(120, 40).unwrap(), Geometry { cols: 120, rows: 40 });
    }

    #[test]
    fn geometry_default_is_80x30() {
        let geometry = Geometry::default();
        assert_eq!(geometry.cols, 80);
        assert_eq!(geometry.rows, 30);
        assert_eq!(geometry.to_string(), "80x30");
    }

    #[test]
    fn geometry_to_pty_size() {
        let size = Geometry { cols: 100, rows: 50 }.to_pty_size();
        assert_eq!(size.cols, 100);
        assert_eq!(size.rows, 50);
        assert_eq!(size.pixel_width, 0);
    }

    #[test]
    fn spawn_options_inherit_nothing_by_default() {
        let opts = SpawnOptions::new("/bin/sh");
        assert_eq!(opts.program, "/bin/sh");
        assert!(opts.args.is_empty());
        assert!(opts.env.is_empty());
        assert!(!opts.inherit_env);
        assert!(opts.working_dir.is_none());
        assert_eq!(opts.term, DEFAULT_TERM);
        assert_eq!(opts.output_depth, DEFAULT_CHANNEL_DEPTH);
    }

    #[test]
    fn spawn_options_builder() {
        let opts = SpawnOptions::new("bash")
            .args(["--login"])
            .geometry(Geometry { cols: 132, rows: 43 })
            .working_dir("/tmp")
            .env("FOO", "bar")
            .inherit_env(true)
            .term("xterm-256color")
            .channel_depths(0, 8);
        assert_eq!(opts.args, vec!["--login".to_string()]);
        assert_eq!(opts.geometry.cols, 132);
        assert_eq!(opts.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(opts.env, vec![("FOO".to_string(), "bar".to_string())]);
        assert!(opts.inherit_env);
        assert_eq!(opts.term, "xterm-256color");
        assert_eq!(opts.output_depth, 1);
        assert_eq!(opts.input_depth, 8);
    }

    #[test]
    fn process_signal_deserializes_lowercase() {
        let signal: ProcessSignal = serde_json::from_str("\"interrupt\"").unwrap();
        assert_eq!(signal, ProcessSignal::Interrupt);
        assert_eq!(signal.name(), "SIGINT");
        assert!(serde_json::from_str::<ProcessSignal>("\"SIGINT\"").is_err());
    }
}

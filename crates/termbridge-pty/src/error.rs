//! PTY error types.

/// Errors originating from PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("failed to resize PTY: {0}")]
    ResizeFailed(String),

    #[error("invalid terminal geometry {cols}x{rows}")]
    InvalidGeometry { cols: u16, rows: u16 },

    #[error("failed to deliver {signal}: {reason}")]
    SignalFailed { signal: &'static str, reason: String },

    #[error("not supported on this platform: {0}")]
    Unsupported(String),
}

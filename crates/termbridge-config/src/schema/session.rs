use serde::{Deserialize, Serialize};

/// Per-session bridging behavior: timeouts, buffering, control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wait after SIGHUP before escalating to SIGKILL (valid range: 100-60000).
    pub grace_period_ms: u32,
    /// How long to keep forwarding output after the process exits (0-5000).
    pub drain_timeout_ms: u32,
    /// Budget for sending the close frame to the client (100-30000).
    pub close_timeout_ms: u32,
    /// Output chunks buffered between the PTY and the client (1-4096).
    pub output_buffer_chunks: u32,
    /// Input chunks buffered between the client and the PTY (1-4096).
    pub input_buffer_chunks: u32,
    /// Interpret JSON text frames as resize/signal requests.
    pub control_frames: bool,
    /// Ping the client this often; two silent intervals end the session.
    /// 0 disables the heartbeat (otherwise 1000-600000).
    pub ping_interval_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 3000,
            drain_timeout_ms: 200,
            close_timeout_ms: 1000,
            output_buffer_chunks: 64,
            input_buffer_chunks: 64,
            control_frames: true,
            ping_interval_ms: 30_000,
        }
    }
}

//! Bridge wire protocol.
//!
//! Payloads are opaque bytes in both directions. The only structure is an
//! optional control channel: a client text frame holding a JSON object with
//! a known `type` is a control frame. Everything else is terminal input.

use serde::Deserialize;
use termbridge_pty::ProcessSignal;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

pub const REASON_PROCESS_EXITED: &str = "process exited";
pub const REASON_SHUTDOWN: &str = "server shutting down";
pub const REASON_SPAWN_FAILED: &str = "failed to spawn shell";
pub const REASON_INPUT_FAILED: &str = "terminal input failed";
pub const REASON_STREAM_ERROR: &str = "stream error";

/// Control messages a client may multiplex alongside raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlFrame {
    #[serde(rename = "resize")]
    Resize { cols: u16, rows: u16 },

    #[serde(rename = "signal")]
    Signal { signal: ProcessSignal },
}

impl ControlFrame {
    /// Interpret a text frame as a control frame, if it is one.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.trim_start().starts_with('{') {
            return None;
        }
        serde_json::from_str(text).ok()
    }
}

/// Build a close frame with a static reason.
pub fn close_frame(code: CloseCode, reason: &'static str) -> CloseFrame {
    CloseFrame {
        code,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resize() {
        assert_eq!(
            ControlFrame::parse(r#"{"type":"resize","cols":120,"rows":40}"#),
            Some(ControlFrame::Resize { cols: 120, rows: 40 })
        );
    }

    #[test]
    fn parses_signal() {
        assert_eq!(
            ControlFrame::parse(r#" {"type":"signal","signal":"interrupt"}"#),
            Some(ControlFrame::Signal {
                signal: ProcessSignal::Interrupt
            })
        );
    }

    #[test]
    fn plain_input_is_not_a_control_frame() {
        assert_eq!(ControlFrame::parse("ls -la\n"), None);
        assert_eq!(ControlFrame::parse("\u{3}"), None);
        assert_eq!(ControlFrame::parse(""), None);
    }

    #[test]
    fn unknown_or_malformed_json_is_input() {
        assert_eq!(ControlFrame::parse(r#"{"type":"paste","data":"x"}"#), None);
        assert_eq!(ControlFrame::parse(r#"{"type":"resize","cols":-1,"rows":2}"#), None);
        assert_eq!(ControlFrame::parse(r#"{"type":"signal","signal":"SIGINT"}"#), None);
        assert_eq!(ControlFrame::parse("{ not json"), None);
    }

    #[test]
    fn close_frame_carries_code_and_reason() {
        let frame = close_frame(CloseCode::Away, REASON_SHUTDOWN);
        assert_eq!(frame.code, CloseCode::Away);
        assert_eq!(frame.reason.as_str(), "server shutting down");
    }
}

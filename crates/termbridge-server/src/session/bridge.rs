//! The two forwarding directions of a session, plus the client heartbeat.

use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use termbridge_common::SessionId;
use termbridge_pty::{Geometry, ProcessControl};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

use super::{SessionEnd, StreamError};
use crate::protocol::ControlFrame;

/// When the client was last heard from.
///
/// While input is held back by a process that is not reading, the client is
/// not read either, so silence in that window does not count.
pub(super) struct Liveness {
    origin: Instant,
    last_seen_ms: AtomicU64,
    held: AtomicBool,
}

impl Liveness {
    pub(super) fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
            held: AtomicBool::new(false),
        }
    }

    fn hold(&self, held: bool) {
        self.held.store(held, Ordering::Relaxed);
        self.touch();
    }

    fn touch(&self) {
        let now = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_seen_ms.store(now, Ordering::Relaxed);
    }

    fn idle(&self) -> Duration {
        if self.held.load(Ordering::Relaxed) {
            return Duration::ZERO;
        }
        let last_seen = Duration::from_millis(self.last_seen_ms.load(Ordering::Relaxed));
        self.origin.elapsed().saturating_sub(last_seen)
    }
}

/// Ping schedule for a session. `None` disables pings.
pub(super) fn ping_schedule(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| {
        let mut ping = tokio::time::interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping
    })
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(ping) => {
            ping.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolve once the client has been silent for `deadline`. Any inbound
/// frame, pongs included, counts as a sign of life.
pub(super) async fn watchdog(liveness: &Liveness, deadline: Option<Duration>) -> SessionEnd {
    let Some(deadline) = deadline else {
        return std::future::pending().await;
    };
    loop {
        let idle = liveness.idle();
        if idle >= deadline {
            return SessionEnd::Stream(StreamError::Unresponsive(deadline));
        }
        tokio::time::sleep(deadline - idle).await;
    }
}

/// Process output → client, one binary frame per chunk, with pings mixed in
/// on the `ping` schedule.
///
/// A chunk is only taken from the channel once the sink can accept it, so
/// dropping this future never loses output. Waiting on the sink also leaves
/// the bounded output channel full and the PTY reader blocked while the
/// client is slow.
pub(super) async fn forward_output<S>(
    sink: &mut S,
    output: &mut mpsc::Receiver<Vec<u8>>,
    ping: &mut Option<Interval>,
) -> SessionEnd
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        if let Err(e) = poll_fn(|cx| sink.poll_ready_unpin(cx)).await {
            return SessionEnd::Stream(StreamError::ClientWrite(e));
        }
        let message = tokio::select! {
            chunk = output.recv() => match chunk {
                Some(chunk) => Message::Binary(chunk.into()),
                None => return SessionEnd::ProcessExited,
            },
            () = next_ping(ping) => Message::Ping(Vec::new().into()),
        };
        if let Err(e) = sink.start_send_unpin(message) {
            return SessionEnd::Stream(StreamError::ClientWrite(e));
        }
        if let Err(e) = sink.flush().await {
            return SessionEnd::Stream(StreamError::ClientWrite(e));
        }
    }
}

/// Client → process input. Text and binary frames are both raw bytes unless
/// the text is a recognised control frame.
pub(super) async fn forward_input<S>(
    stream: &mut S,
    input: &mpsc::Sender<Vec<u8>>,
    control: &mut dyn ProcessControl,
    control_frames: bool,
    liveness: &Liveness,
    id: &SessionId,
) -> SessionEnd
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        if frame.is_ok() {
            liveness.touch();
        }
        let payload = match frame {
            Ok(Message::Binary(bytes)) => bytes.to_vec(),
            Ok(Message::Text(text)) => {
                if control_frames {
                    if let Some(frame) = ControlFrame::parse(text.as_str()) {
                        apply_control(control, frame, id);
                        continue;
                    }
                }
                text.as_bytes().to_vec()
            }
            Ok(Message::Close(_)) => return SessionEnd::ClientClosed,
            Ok(_) => continue,
            Err(e) => return SessionEnd::Stream(StreamError::ClientRead(e)),
        };

        if payload.is_empty() {
            continue;
        }
        liveness.hold(true);
        let sent = input.send(payload).await;
        liveness.hold(false);
        if sent.is_err() {
            return SessionEnd::Stream(StreamError::ProcessInputClosed);
        }
    }
    SessionEnd::ClientClosed
}

fn apply_control(control: &mut dyn ProcessControl, frame: ControlFrame, id: &SessionId) {
    match frame {
        ControlFrame::Resize { cols, rows } => {
            let resized = Geometry::new(cols, rows)
                .and_then(|geometry| control.resize(geometry).map(|()| geometry));
            match resized {
                Ok(geometry) => {
                    debug!(session = %id.short(), %geometry, "terminal resized");
                }
                Err(e) => warn!(session = %id.short(), error = %e, "ignoring resize"),
            }
        }
        ControlFrame::Signal { signal } => match control.signal(signal) {
            Ok(()) => debug!(session = %id.short(), signal = signal.name(), "signal delivered"),
            Err(e) => warn!(session = %id.short(), error = %e, "signal not delivered"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_idle_resets_on_touch() {
        let liveness = Liveness::new();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(liveness.idle() >= Duration::from_millis(30));
        liveness.touch();
        assert!(liveness.idle() < Duration::from_millis(30));
    }

    #[tokio::test]
    async fn held_input_is_never_idle() {
        let liveness = Liveness::new();
        liveness.hold(true);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(liveness.idle(), Duration::ZERO);
        liveness.hold(false);
        assert!(liveness.idle() < Duration::from_millis(30));
    }

    #[tokio::test]
    async fn watchdog_fires_after_silence() {
        let liveness = Liveness::new();
        let end = tokio::time::timeout(
            Duration::from_secs(1),
            watchdog(&liveness, Some(Duration::from_millis(50))),
        )
        .await
        .unwrap();
        assert!(matches!(end, SessionEnd::Stream(StreamError::Unresponsive(_))));
    }

    #[tokio::test]
    async fn watchdog_disabled_never_fires() {
        let liveness = Liveness::new();
        let fired =
            tokio::time::timeout(Duration::from_millis(100), watchdog(&liveness, None)).await;
        assert!(fired.is_err());
    }
}

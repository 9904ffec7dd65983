//! One bridged connection: a WebSocket client paired with one PTY process.
//!
//! A session forwards bytes both ways until either side goes away or the
//! server shuts down, then tears down in a fixed order: stop accepting
//! input, drain buffered output (only when the process exited), stop the
//! process, close the connection, and leave the registry.

mod bridge;
mod state;


use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use termbridge_common::SessionId;
use termbridge_pty::{wait_for_exit, ProcessControl, Termination};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use state::SessionState;

use crate::protocol;
use crate::registry::SessionRegistry;

/// Timing and protocol knobs shared by every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Time a process gets to exit after the polite signal.
    pub grace_period: Duration,
    /// How long buffered output is still forwarded after the process exits.
    pub drain_timeout: Duration,
    /// Upper bound on the closing handshake.
    pub close_timeout: Duration,
    /// Interpret JSON text frames as resize/signal requests.
    pub control_frames: bool,
    /// How often the client is pinged. A client silent for two intervals is
    /// dropped. `None` disables the heartbeat.
    pub ping_interval: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(3_000),
            drain_timeout: Duration::from_millis(200),
            close_timeout: Duration::from_millis(1_000),
            control_frames: true,
            ping_interval: Some(Duration::from_millis(30_000)),
        }
    }
}

/// A stream failure that ended a session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("client read failed: {0}")]
    ClientRead(#[source] WsError),

    #[error("client write failed: {0}")]
    ClientWrite(#[source] WsError),

    #[error("process input closed")]
    ProcessInputClosed,

    #[error("client silent for {0:?}")]
    Unresponsive(Duration),
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    ProcessExited,
    ClientClosed,
    Stream(StreamError),
    Shutdown,
}

impl SessionEnd {
    fn close_frame(&self) -> Option<Message> {
        let (code, reason) = match self {
            SessionEnd::ProcessExited => (CloseCode::Normal, protocol::REASON_PROCESS_EXITED),
            SessionEnd::Shutdown => (CloseCode::Away, protocol::REASON_SHUTDOWN),
            SessionEnd::Stream(StreamError::ProcessInputClosed) => {
                (CloseCode::Error, protocol::REASON_INPUT_FAILED)
            }
            SessionEnd::Stream(_) => (CloseCode::Error, protocol::REASON_STREAM_ERROR),
            // tungstenite answers the client's close frame itself.
            SessionEnd::ClientClosed => return None,
        };
        Some(Message::Close(Some(protocol::close_frame(code, reason))))
    }
}

pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    control: Box<dyn ProcessControl>,
    registry: SessionRegistry,
    settings: SessionSettings,
    state: SessionState,
    stopped: bool,
}

impl Session {
    pub fn new(
        id: SessionId,
        peer: SocketAddr,
        control: Box<dyn ProcessControl>,
        registry: SessionRegistry,
        settings: SessionSettings,
    ) -> Self {
        Self {
            id,
            peer,
            control,
            registry,
            settings,
            state: SessionState::Active,
            stopped: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bridge `ws` and the process until one side ends, then tear down.
    pub async fn run<T>(
        mut self,
        ws: WebSocketStream<T>,
        mut output: mpsc::Receiver<Vec<u8>>,
        input: mpsc::Sender<Vec<u8>>,
        cancel: CancellationToken,
    ) -> SessionEnd
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut sink, mut stream) = ws.split();
        let mut exit = self.control.exit_watch();
        let mut ping = bridge::ping_schedule(self.settings.ping_interval);
        let liveness = bridge::Liveness::new();
        let deadline = self.settings.ping_interval.map(|period| period * 2);

        let end = tokio::select! {
            end = bridge::forward_output(&mut sink, &mut output, &mut ping) => end,
            end = bridge::forward_input(
                &mut stream,
                &input,
                self.control.as_mut(),
                self.settings.control_frames,
                &liveness,
                &self.id,
            ) => end,
            end = bridge::watchdog(&liveness, deadline) => end,
            _ = wait_for_exit(&mut exit) => SessionEnd::ProcessExited,
            _ = cancel.cancelled() => SessionEnd::Shutdown,
        };

        self.state.advance(SessionState::Closing);
        debug!(session = %self.id.short(), end = ?end, "session closing");
        drop(input);

        if matches!(end, SessionEnd::ProcessExited) && !self.settings.drain_timeout.is_zero() {
            let drained = tokio::time::timeout(
                self.settings.drain_timeout,
                bridge::forward_output(&mut sink, &mut output, &mut None),
            )
            .await;
            if drained.is_err() {
                debug!(session = %self.id.short(), "output drain timed out");
            }
        }
        drop(output);

        self.terminate().await;
        close_client(&mut sink, &end, &self.id, self.settings.close_timeout).await;

        self.registry.remove(&self.id).await;
        self.state.advance(SessionState::Terminated);
        info!(
            session = %self.id.short(),
            peer = %self.peer,
            end = ?end,
            "session ended"
        );
        end
    }

    /// Stop the process. Only the first call does anything; later calls
    /// return `None`.
    pub async fn terminate(&mut self) -> Option<Termination> {
        if self.stopped {
            return None;
        }
        self.stopped = true;
        self.state.advance(SessionState::Closing);

        let termination = self.control.terminate(self.settings.grace_period).await;
        match termination {
            Termination::Exited(exit) => {
                debug!(
                    session = %self.id.short(),
                    code = exit.map(|e| e.code),
                    "process stopped"
                );
            }
            Termination::Killed => {
                warn!(session = %self.id.short(), "process ignored hangup, killed");
            }
            Termination::AlreadyTerminated => {}
        }
        Some(termination)
    }
}

async fn close_client<S>(sink: &mut S, end: &SessionEnd, id: &SessionId, close_timeout: Duration)
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let frame = end.close_frame();
    let closing = async {
        if let Some(frame) = frame {
            sink.send(frame).await?;
        }
        sink.close().await
    };
    match tokio::time::timeout(close_timeout, closing).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(session = %id.short(), error = %e, "close handshake failed"),
        Err(_) => debug!(session = %id.short(), "close handshake timed out"),
    }
}

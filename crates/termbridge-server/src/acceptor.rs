//! Connection acceptor: upgrades requests on the terminal route, spawns a
//! process per connection, and runs each pairing as its own session task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use termbridge_common::SessionId;
use termbridge_config::BridgeConfig;
use termbridge_pty::{ProcessHandle, PtyError, SpawnOptions, Supervisor};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::options;
use crate::protocol;
use crate::registry::{SessionRegistry, SessionSummary};
use crate::session::{Session, SessionEnd, SessionSettings};

pub const DEFAULT_ROUTE: &str = "/terminal";
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the live session count is logged.
const REGISTRY_TICK: Duration = Duration::from_secs(60);

pub struct Acceptor {
    supervisor: Arc<dyn Supervisor>,
    registry: SessionRegistry,
    spawn: SpawnOptions,
    settings: SessionSettings,
    route: String,
    handshake_timeout: Duration,
    /// Parent of every session's cancel token. Cancelled once `serve` stops
    /// accepting, so connections still mid-handshake or mid-spawn end too.
    closing: CancellationToken,
}

impl Acceptor {
    pub fn new(
        supervisor: Arc<dyn Supervisor>,
        spawn: SpawnOptions,
        settings: SessionSettings,
    ) -> Self {
        Self {
            supervisor,
            registry: SessionRegistry::new(),
            spawn,
            settings,
            route: DEFAULT_ROUTE.to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            closing: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &BridgeConfig, supervisor: Arc<dyn Supervisor>) -> Self {
        Self::new(
            supervisor,
            options::spawn_options(config),
            options::session_settings(&config.session),
        )
        .with_route(config.server.route.clone())
        .with_handshake_timeout(Duration::from_secs(u64::from(
            config.server.handshake_timeout_secs,
        )))
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Accept connections until `shutdown` fires, then close every live
    /// session and wait for them to finish.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, shutdown: CancellationToken) {
        let mut tick = tokio::time::interval(REGISTRY_TICK);
        tick.tick().await;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let acceptor = Arc::clone(&self);
                        tokio::spawn(async move {
                            acceptor.handle_stream(stream, peer).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "TCP accept error"),
                },
                _ = tick.tick() => {
                    let sessions = self.registry.count().await;
                    debug!(sessions, "registry tick");
                }
                _ = shutdown.cancelled() => break,
            }
        }
        drop(listener);
        self.closing.cancel();
        self.drain().await;
    }

    async fn drain(&self) {
        let signalled = self.registry.shutdown_all().await;
        info!(sessions = signalled, "shutting down");

        let budget = self.settings.grace_period
            + self.settings.drain_timeout
            + self.settings.close_timeout
            + Duration::from_secs(1);
        if tokio::time::timeout(budget, self.registry.wait_until_empty())
            .await
            .is_err()
        {
            let remaining = self.registry.count().await;
            warn!(remaining, "sessions still open at shutdown");
        }
    }

    /// Run the WebSocket handshake on a raw connection, then bridge it.
    pub async fn handle_stream<T>(&self, stream: T, peer: SocketAddr)
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let route = self.route.clone();
        let check_route = move |request: &Request, response: Response| {
            if request.uri().path() == route {
                return Ok(response);
            }
            let mut refusal: ErrorResponse =
                ErrorResponse::new(Some(format!("no terminal at {}", request.uri().path())));
            *refusal.status_mut() = StatusCode::NOT_FOUND;
            Err(refusal)
        };

        match tokio::time::timeout(self.handshake_timeout, accept_hdr_async(stream, check_route))
            .await
        {
            Ok(Ok(ws)) => {
                self.handle_connection(ws, peer).await;
            }
            Ok(Err(e)) => warn!(peer = %peer, error = %e, "WS handshake failed"),
            Err(_) => warn!(peer = %peer, "WS handshake timed out"),
        }
    }

    /// Bridge an upgraded connection to a fresh process.
    ///
    /// Returns `None` when no session was started or its task panicked.
    pub async fn handle_connection<T>(
        &self,
        mut ws: WebSocketStream<T>,
        peer: SocketAddr,
    ) -> Option<SessionEnd>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.closing.is_cancelled() {
            debug!(peer = %peer, "refusing connection during shutdown");
            let refusal = protocol::close_frame(CloseCode::Away, protocol::REASON_SHUTDOWN);
            let _ = tokio::time::timeout(self.settings.close_timeout, ws.close(Some(refusal))).await;
            return None;
        }
        let handle = match self.spawn_process().await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(peer = %peer, program = %self.spawn.program, error = %e, "spawn failed");
                let refusal = protocol::close_frame(CloseCode::Error, protocol::REASON_SPAWN_FAILED);
                let _ = tokio::time::timeout(self.settings.close_timeout, ws.close(Some(refusal))).await;
                return None;
            }
        };
        let ProcessHandle {
            control,
            output,
            input,
        } = handle;

        let id = SessionId::new();
        // Already cancelled if shutdown began while the process was spawning.
        let cancel = self.closing.child_token();
        let summary = SessionSummary {
            id: id.clone(),
            peer,
            pid: control.pid(),
            program: self.spawn.program.clone(),
            geometry: control.geometry(),
            started_at: Utc::now(),
        };
        let pid = summary.pid;
        if !self.registry.insert(summary, cancel.clone()).await {
            error!(session = %id, "duplicate session id");
            let mut control = control;
            control.terminate(self.settings.grace_period).await;
            return None;
        }
        info!(session = %id.short(), peer = %peer, pid = ?pid, "session started");

        let session = Session::new(
            id.clone(),
            peer,
            control,
            self.registry.clone(),
            self.settings.clone(),
        );
        let task = tokio::spawn(session.run(ws, output, input, cancel));
        match task.await {
            Ok(end) => Some(end),
            Err(e) => {
                error!(session = %id.short(), error = %e, "session task failed");
                self.registry.remove(&id).await;
                None
            }
        }
    }

    async fn spawn_process(&self) -> Result<ProcessHandle, PtyError> {
        let supervisor = Arc::clone(&self.supervisor);
        let options = self.spawn.clone();
        tokio::task::spawn_blocking(move || supervisor.spawn(&options))
            .await
            .map_err(|e| PtyError::SpawnFailed(format!("spawn task failed: {e}")))?
    }
}

//! termbridge: bridges WebSocket clients to shell processes on
//! pseudo-terminals.
//!
//! Each upgrade on the terminal route gets its own process. Output bytes go
//! to the client as binary frames; client frames are written to the process
//! as input. Either side ending tears the pair down.

pub mod acceptor;
pub mod options;
pub mod protocol;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use termbridge_config::BridgeConfig;
use termbridge_pty::NativeSupervisor;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use acceptor::Acceptor;
pub use registry::{SessionRegistry, SessionSummary};
pub use session::{Session, SessionEnd, SessionSettings, SessionState, StreamError};

/// Bind the configured address and serve until `shutdown` fires.
pub async fn run(config: &BridgeConfig, shutdown: CancellationToken) -> termbridge_common::Result<()> {
    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("termbridge listening on ws://{}{}", addr, config.server.route);

    let acceptor = Arc::new(Acceptor::from_config(config, Arc::new(NativeSupervisor)));
    acceptor.serve(listener, shutdown).await;
    tracing::info!("shutdown complete");
    Ok(())
}

//! Process supervisor for termbridge.
//!
//! Spawns a command attached to a pseudo-terminal using `portable-pty` and
//! exposes its output and input as bounded async channels, plus a
//! [`ProcessControl`] handle for resize, signals, and termination.
//!
//! Output flows PTY reader thread → `mpsc` → consumer. Input flows
//! producer → `mpsc` → PTY writer thread. Both channels are bounded, so a
//! slow consumer stalls the reader thread instead of growing memory.

mod error;
mod process;
mod signal;
mod spawn;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

pub use error::PtyError;
pub use process::NativeProcess;
pub use spawn::{default_shell, NativeSupervisor};
pub use types::{
    Geometry, ProcessExit, ProcessSignal, SpawnOptions, Termination, DEFAULT_CHANNEL_DEPTH,
    DEFAULT_COLS, DEFAULT_ROWS, DEFAULT_TERM, PTY_READ_CHUNK,
};

/// Lifecycle operations on a spawned process.
#[async_trait]
pub trait ProcessControl: Send {
    /// OS process id, if known.
    fn pid(&self) -> Option<u32>;

    /// Current terminal geometry.
    fn geometry(&self) -> Geometry;

    /// Propagate a geometry change to the kernel PTY.
    fn resize(&mut self, geometry: Geometry) -> Result<(), PtyError>;

    /// Deliver a signal to the process.
    fn signal(&mut self, signal: ProcessSignal) -> Result<(), PtyError>;

    /// Watch that becomes `Some` once the process has been reaped.
    fn exit_watch(&self) -> watch::Receiver<Option<ProcessExit>>;

    /// Stop the process: polite signal, then a forceful kill after `grace`.
    ///
    /// Calling this more than once returns [`Termination::AlreadyTerminated`].
    async fn terminate(&mut self, grace: Duration) -> Termination;
}

/// Everything a caller gets back from a successful spawn.
pub struct ProcessHandle {
    pub control: Box<dyn ProcessControl>,
    /// Raw output chunks. Closes when the PTY reaches EOF.
    pub output: mpsc::Receiver<Vec<u8>>,
    /// Raw input chunks. Dropping the sender stops the writer thread.
    pub input: mpsc::Sender<Vec<u8>>,
}

/// Creates PTY-backed processes.
pub trait Supervisor: Send + Sync {
    fn spawn(&self, options: &SpawnOptions) -> Result<ProcessHandle, PtyError>;
}

/// Wait until `exit` reports the process as reaped.
///
/// Returns `None` only if the watch was dropped without an exit being
/// recorded.
pub async fn wait_for_exit(exit: &mut watch::Receiver<Option<ProcessExit>>) -> Option<ProcessExit> {
    let waited = exit.wait_for(Option::is_some).await.map(|status| *status);
    match waited {
        Ok(status) => status,
        Err(_) => *exit.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_for_exit_returns_recorded_status() {
        let (tx, mut rx) = watch::channel(None);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send_replace(Some(ProcessExit { code: 7 }));
        });
        let exit = wait_for_exit(&mut rx).await;
        assert_eq!(exit, Some(ProcessExit { code: 7 }));
    }

    #[tokio::test]
    async fn wait_for_exit_returns_none_when_sender_dropped() {
        let (tx, mut rx) = watch::channel::<Option<ProcessExit>>(None);
        drop(tx);
        assert_eq!(wait_for_exit(&mut rx).await, None);
    }

    #[tokio::test]
    async fn wait_for_exit_is_immediate_when_already_exited() {
        let (_tx, mut rx) = watch::channel(Some(ProcessExit { code: 0 }));
        let exit = tokio::time::timeout(Duration::from_millis(100), wait_for_exit(&mut rx))
            .await
            .expect("should not block");
        assert_eq!(exit, Some(ProcessExit { code: 0 }));
    }
}

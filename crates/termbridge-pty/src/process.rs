//! Native process handle: resize, signals, and graceful termination.

use std::time::Duration;

use async_trait::async_trait;
use portable_pty::{ChildKiller, MasterPty};
use tokio::sync::watch;

use crate::error::PtyError;
use crate::signal as signals;
use crate::types::{Geometry, ProcessExit, ProcessSignal, Termination};
use crate::{wait_for_exit, ProcessControl};

/// How long to wait for the kernel to reap a SIGKILLed child.
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// Control side of a process spawned by [`crate::NativeSupervisor`].
///
/// Owns the PTY master (needed for resize and to keep the PTY open) and a
/// killer for the child. The child itself is owned by a waiter thread that
/// publishes its exit status through `exit`.
pub struct NativeProcess {
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
    geometry: Geometry,
    exit: watch::Receiver<Option<ProcessExit>>,
    terminated: bool,
}

impl NativeProcess {
    pub(crate) fn new(
        master: Box<dyn MasterPty + Send>,
        killer: Box<dyn ChildKiller + Send + Sync>,
        pid: Option<u32>,
        geometry: Geometry,
        exit: watch::Receiver<Option<ProcessExit>>,
    ) -> Self {
        Self {
            master,
            killer,
            pid,
            geometry,
            exit,
            terminated: false,
        }
    }

    fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// SIGHUP is what a closing terminal delivers; shells ignore SIGTERM.
    fn hang_up(&mut self) -> Result<(), PtyError> {
        match self.pid {
            Some(pid) if cfg!(unix) => signals::deliver(pid, ProcessSignal::Hangup),
            _ => self.killer.kill().map_err(PtyError::from),
        }
    }

    fn force_kill(&mut self) {
        let result = match self.pid {
            Some(pid) if cfg!(unix) => signals::deliver(pid, ProcessSignal::Kill),
            _ => self.killer.kill().map_err(PtyError::from),
        };
        if let Err(e) = result {
            tracing::debug!(pid = ?self.pid, "PTY kill error (may already be dead): {e}");
        }
    }
}

#[async_trait]
impl ProcessControl for NativeProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn resize(&mut self, geometry: Geometry) -> Result<(), PtyError> {
        self.master
            .resize(geometry.to_pty_size())
            .map_err(|e| PtyError::ResizeFailed(e.to_string()))?;
        self.geometry = geometry;
        Ok(())
    }

    fn signal(&mut self, signal: ProcessSignal) -> Result<(), PtyError> {
        if self.has_exited() {
            return Err(PtyError::SignalFailed {
                signal: signal.name(),
                reason: "process has exited".into(),
            });
        }
        match (self.pid, signal) {
            (Some(pid), _) if cfg!(unix) => signals::deliver(pid, signal),
            (_, ProcessSignal::Kill) => self.killer.kill().map_err(PtyError::from),
            _ => Err(PtyError::Unsupported(format!(
                "{} cannot be delivered on this platform",
                signal.name()
            ))),
        }
    }

    fn exit_watch(&self) -> watch::Receiver<Option<ProcessExit>> {
        self.exit.clone()
    }

    async fn terminate(&mut self, grace: Duration) -> Termination {
        if self.terminated {
            return Termination::AlreadyTerminated;
        }
        self.terminated = true;

        let mut exit = self.exit.clone();
        let already = *exit.borrow();
        if let Some(status) = already {
            return Termination::Exited(Some(status));
        }

        if let Err(e) = self.hang_up() {
            tracing::debug!(pid = ?self.pid, "SIGHUP failed: {e}");
        }

        match tokio::time::timeout(grace, wait_for_exit(&mut exit)).await {
            Ok(status) => Termination::Exited(status),
            Err(_) => {
                tracing::warn!(
                    pid = ?self.pid,
                    grace_ms = grace.as_millis() as u64,
                    "process ignored SIGHUP, escalating to SIGKILL"
                );
                self.force_kill();
                if tokio::time::timeout(REAP_TIMEOUT, wait_for_exit(&mut exit))
                    .await
                    .is_err()
                {
                    tracing::warn!(pid = ?self.pid, "process not reaped after SIGKILL");
                }
                Termination::Killed
            }
        }
    }
}

impl Drop for NativeProcess {
    fn drop(&mut self) {
        // The PTY fd closes with `master`; make sure nothing is left attached.
        if !self.terminated && !self.has_exited() {
            self.force_kill();
        }
    }
}

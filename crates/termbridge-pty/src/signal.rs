//! Signal delivery to a child process id.

use crate::error::PtyError;
use crate::types::ProcessSignal;

#[cfg(unix)]
pub(crate) fn deliver(pid: u32, signal: ProcessSignal) -> Result<(), PtyError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| PtyError::SignalFailed {
        signal: signal.name(),
        reason: format!("pid {pid} out of range"),
    })?;

    let sig = match signal {
        ProcessSignal::Interrupt => Signal::SIGINT,
        ProcessSignal::Terminate => Signal::SIGTERM,
        ProcessSignal::Hangup => Signal::SIGHUP,
        ProcessSignal::Quit => Signal::SIGQUIT,
        ProcessSignal::Kill => Signal::SIGKILL,
    };

    kill(Pid::from_raw(raw), sig).map_err(|errno| PtyError::SignalFailed {
        signal: signal.name(),
        reason: errno.to_string(),
    })
}

#[cfg(not(unix))]
pub(crate) fn deliver(_pid: u32, signal: ProcessSignal) -> Result<(), PtyError> {
    Err(PtyError::Unsupported(format!(
        "{} cannot be delivered on this platform",
        signal.name()
    )))
}

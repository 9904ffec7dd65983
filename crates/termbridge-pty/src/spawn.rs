//! PTY spawn logic: open a PTY, start the command, wire up the pump threads.

use std::io::{Read, Write};
use std::thread;

use portable_pty::{native_pty_system, Child, CommandBuilder};
use tokio::sync::{mpsc, watch};

use crate::error::PtyError;
use crate::process::NativeProcess;
use crate::types::{ProcessExit, SpawnOptions, PTY_READ_CHUNK};
use crate::{ProcessHandle, Supervisor};

// =============================================================================
// COMMAND
// =============================================================================

/// The operator's shell: `$SHELL` if it is executable, otherwise the
/// password database entry, otherwise `/bin/sh`.
pub fn default_shell() -> String {
    CommandBuilder::new_default_prog().get_shell()
}

/// Build the `CommandBuilder` for `options`.
///
/// `TERM` is always exported; explicit `env` entries win over inherited ones.
/// In login mode `SHELL` names the program and portable-pty starts it with
/// `-<basename>` as argv0, which every Unix shell reads as "login shell".
fn build_command(options: &SpawnOptions) -> Result<CommandBuilder, PtyError> {
    let login = options.login && cfg!(unix);
    let mut cmd = if login {
        CommandBuilder::new_default_prog()
    } else {
        let mut cmd = CommandBuilder::new(&options.program);
        cmd.args(&options.args);
        cmd
    };

    if !options.inherit_env {
        cmd.env_clear();
    }
    cmd.env("TERM", &options.term);
    for (key, value) in &options.env {
        cmd.env(key, value);
    }
    if login {
        cmd.env("SHELL", &options.program);
        // get_shell falls back to the passwd shell when SHELL is not runnable.
        if cmd.get_shell() != options.program {
            return Err(PtyError::SpawnFailed(format!(
                "'{}' is not an executable shell",
                options.program
            )));
        }
    }

    if let Some(dir) = &options.working_dir {
        cmd.cwd(dir);
    }

    Ok(cmd)
}

// =============================================================================
// SUPERVISOR
// =============================================================================

/// [`Supervisor`] backed by the host's native PTY implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSupervisor;

impl Supervisor for NativeSupervisor {
    fn spawn(&self, options: &SpawnOptions) -> Result<ProcessHandle, PtyError> {
        let pair = native_pty_system()
            .openpty(options.geometry.to_pty_size())
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let mut child = pair
            .slave
            .spawn_command(build_command(options)?)
            .map_err(|e| {
                PtyError::SpawnFailed(format!("failed to spawn '{}': {e}", options.program))
            })?;

        // Only the child keeps the slave open, so EOF on the master means exit.
        drop(pair.slave);

        let io = pair
            .master
            .try_clone_reader()
            .and_then(|reader| Ok((reader, pair.master.take_writer()?)));
        let (reader, writer) = match io {
            Ok(io) => io,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PtyError::SpawnFailed(format!("failed to attach PTY: {e}")));
            }
        };

        let pid = child.process_id();
        let (exit_tx, exit_rx) = watch::channel(None);
        let process = NativeProcess::new(
            pair.master,
            child.clone_killer(),
            pid,
            options.geometry,
            exit_rx,
        );

        // From here on, dropping `process` kills the child.
        spawn_waiter(child, exit_tx)?;

        let (output_tx, output_rx) = mpsc::channel(options.output_depth.max(1));
        spawn_reader(reader, output_tx)?;

        let (input_tx, input_rx) = mpsc::channel(options.input_depth.max(1));
        spawn_writer(writer, input_rx)?;

        tracing::debug!(
            pid = ?pid,
            program = %options.program,
            geometry = %options.geometry,
            "spawned PTY process"
        );

        Ok(ProcessHandle {
            control: Box::new(process),
            output: output_rx,
            input: input_tx,
        })
    }
}

// =============================================================================
// PUMP THREADS
// =============================================================================

/// Reap the child and publish its exit status.
fn spawn_waiter(
    mut child: Box<dyn Child + Send + Sync>,
    exit_tx: watch::Sender<Option<ProcessExit>>,
) -> Result<(), PtyError> {
    thread::Builder::new()
        .name("pty-waiter".to_string())
        .spawn(move || {
            let code = match child.wait() {
                Ok(status) => status.exit_code(),
                Err(e) => {
                    tracing::debug!("PTY wait error: {e}");
                    1
                }
            };
            exit_tx.send_replace(Some(ProcessExit { code }));
        })
        .map(|_| ())
        .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn PTY waiter thread: {e}")))
}

/// Copy PTY output into the bounded channel.
///
/// `blocking_send` parks this thread while the channel is full, so the kernel
/// PTY buffer fills and the child blocks on write.
fn spawn_reader(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<(), PtyError> {
    thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; PTY_READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF: child exited
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        // Linux reports EIO once the slave side is gone.
                        tracing::debug!("PTY reader finished: {e}");
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn PTY reader thread: {e}")))
}

/// Drain the input channel into the PTY, one flushed write per chunk.
fn spawn_writer(
    mut writer: Box<dyn Write + Send>,
    mut rx: mpsc::Receiver<Vec<u8>>,
) -> Result<(), PtyError> {
    thread::Builder::new()
        .name("pty-writer".to_string())
        .spawn(move || {
            while let Some(chunk) = rx.blocking_recv() {
                if let Err(e) = writer.write_all(&chunk).and_then(|()| writer.flush()) {
                    tracing::debug!("PTY write failed: {e}");
                    break;
                }
            }
        })
        .map(|_| ())
        .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn PTY writer thread: {e}")))
}

// =============================================================================
// TESTS
// =============================================================================

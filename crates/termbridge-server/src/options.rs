//! Turns loaded configuration into spawn options and session settings.

use std::path::PathBuf;
use std::time::Duration;

use termbridge_config::{BridgeConfig, SessionConfig};
use termbridge_pty::{default_shell, Geometry, SpawnOptions};

use crate::session::SessionSettings;

/// Resolve the command every session starts.
///
/// An empty program means the user's shell. With no explicit args and
/// `login_shell` set, the program is started as a login shell. With no
/// working directory configured the process starts in the home directory.
pub fn spawn_options(config: &BridgeConfig) -> SpawnOptions {
    let shell = &config.shell;

    let program = if shell.program.trim().is_empty() {
        default_shell()
    } else {
        shell.program.clone()
    };
    let login = shell.login_shell && shell.args.is_empty();

    let geometry = Geometry::new(
        dimension(config.terminal.cols),
        dimension(config.terminal.rows),
    )
    .unwrap_or_default();

    let mut env: Vec<(String, String)> = shell
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    env.sort();

    let mut options = SpawnOptions::new(program)
        .args(shell.args.clone())
        .login(login)
        .geometry(geometry)
        .inherit_env(shell.inherit_env)
        .term(config.terminal.term.clone())
        .channel_depths(
            config.session.output_buffer_chunks as usize,
            config.session.input_buffer_chunks as usize,
        );
    if let Some(dir) = working_dir(config) {
        options = options.working_dir(dir);
    }
    for (key, value) in env {
        options = options.env(key, value);
    }
    options
}

pub fn session_settings(config: &SessionConfig) -> SessionSettings {
    SessionSettings {
        grace_period: Duration::from_millis(u64::from(config.grace_period_ms)),
        drain_timeout: Duration::from_millis(u64::from(config.drain_timeout_ms)),
        close_timeout: Duration::from_millis(u64::from(config.close_timeout_ms)),
        control_frames: config.control_frames,
        ping_interval: match config.ping_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(u64::from(ms))),
        },
    }
}

fn working_dir(config: &BridgeConfig) -> Option<PathBuf> {
    match config.shell.working_directory.as_deref() {
        Some(dir) if !dir.trim().is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::home_dir(),
    }
}

fn dimension(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

//! Per-section validators: server, shell, terminal, session.

use crate::schema::BridgeConfig;

use super::helpers::{validate_non_empty, validate_range};

/// Validate listener constraints.
pub(crate) fn validate_server(errors: &mut Vec<String>, config: &BridgeConfig) {
    let server = &config.server;
    validate_non_empty(errors, "server.bind", &server.bind);
    if server.port == 0 {
        errors.push("server.port must not be 0".into());
    }
    if !server.route.starts_with('/') {
        errors.push(format!(
            "server.route = {:?} must start with '/'",
            server.route
        ));
    }
    validate_range(
        errors,
        "server.handshake_timeout_secs",
        server.handshake_timeout_secs,
        1,
        120,
    );
}

/// Validate shell constraints.
pub(crate) fn validate_shell(errors: &mut Vec<String>, config: &BridgeConfig) {
    if let Some(dir) = &config.shell.working_directory {
        validate_non_empty(errors, "shell.working_directory", dir);
    }
    for key in config.shell.env.keys() {
        if key.is_empty() || key.contains('=') {
            errors.push(format!("shell.env key {key:?} is not a valid variable name"));
        }
    }
}

/// Validate PTY geometry constraints.
pub(crate) fn validate_terminal(errors: &mut Vec<String>, config: &BridgeConfig) {
    validate_range(errors, "terminal.cols", config.terminal.cols, 1, 1000);
    validate_range(errors, "terminal.rows", config.terminal.rows, 1, 1000);
    validate_non_empty(errors, "terminal.term", &config.terminal.term);
}

/// Validate session timing and buffering constraints.
pub(crate) fn validate_session(errors: &mut Vec<String>, config: &BridgeConfig) {
    let session = &config.session;
    validate_range(
        errors,
        "session.grace_period_ms",
        session.grace_period_ms,
        100,
        60_000,
    );
    validate_range(
        errors,
        "session.drain_timeout_ms",
        session.drain_timeout_ms,
        0,
        5_000,
    );
    validate_range(
        errors,
        "session.close_timeout_ms",
        session.close_timeout_ms,
        100,
        30_000,
    );
    validate_range(
        errors,
        "session.output_buffer_chunks",
        session.output_buffer_chunks,
        1,
        4096,
    );
    validate_range(
        errors,
        "session.input_buffer_chunks",
        session.input_buffer_chunks,
        1,
        4096,
    );
    if session.ping_interval_ms != 0 {
        validate_range(
            errors,
            "session.ping_interval_ms",
            session.ping_interval_ms,
            1_000,
            600_000,
        );
    }
}

//! Configuration schema for termbridge.
//!
//! All types use `#[serde(default)]` so partial TOML files work correctly.

mod logging;
mod server;
mod session;
mod shell;
mod terminal;

pub use logging::{LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use session::SessionConfig;
pub use shell::ShellConfig;
pub use terminal::TerminalConfig;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Top-level termbridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub shell: ShellConfig,
    pub terminal: TerminalConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_deployment() {
        let config = BridgeConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.route, "/terminal");
        assert_eq!(config.terminal.cols, 80);
        assert_eq!(config.terminal.rows, 30);
        assert_eq!(config.terminal.term, "xterm-color");
        assert!(config.shell.login_shell);
        assert!(config.shell.inherit_env);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.session.grace_period_ms, 3000);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_toml_keeps_other_sections() {
        let toml_str = r#"
[server]
port = 8080

[terminal]
cols = 120
"#;
        let config: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.route, "/terminal");
        assert_eq!(config.terminal.cols, 120);
        assert_eq!(config.terminal.rows, 30);
        assert!(config.session.control_frames);
    }
}

//! TOML config file loading and creation.
//!
//! The file lives at `$TERMBRIDGE_CONFIG` when set, otherwise at
//! `<config dir>/termbridge/config.toml`. A missing default file is created
//! from a commented template; failing to create it is not fatal.

mod template;


use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use termbridge_common::ConfigError;
use tracing::{info, warn};

use crate::schema::BridgeConfig;
use crate::validation;

/// Environment variable that points the server at a config file.
pub const CONFIG_ENV: &str = "TERMBRIDGE_CONFIG";

/// Top-level tables the schema understands.
const SECTIONS: [&str; 5] = ["server", "shell", "terminal", "session", "logging"];

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Unknown sections and failed
/// validation are logged, and the parsed config is returned as-is.
pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;
    let config = parse(&content)?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from [`default_config_path`], creating the file when absent.
pub fn load_default() -> Result<BridgeConfig, ConfigError> {
    let path = default_config_path()?;
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let config = parse(&content)?;
            info!("loaded config from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("no config found at {}, creating default", path.display());
            if let Err(e) = create_default_config(&path) {
                warn!("running with defaults: {e}");
            }
            Ok(BridgeConfig::default())
        }
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Where the config file is read from.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    config_path_from(std::env::var_os(CONFIG_ENV), dirs::config_dir())
}

fn config_path_from(
    env_path: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    config_dir
        .map(|dir| dir.join("termbridge").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Write the commented default config to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    std::fs::write(path, template::default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;
    info!("created default config at {}", path.display());
    Ok(())
}

fn parse(content: &str) -> Result<BridgeConfig, ConfigError> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;
    for key in unknown_sections(&table) {
        warn!("ignoring unknown config section [{key}]");
    }

    let config: BridgeConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;
    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
    }
    Ok(config)
}

fn unknown_sections(table: &toml::Table) -> Vec<&str> {
    table
        .keys()
        .map(String::as_str)
        .filter(|key| !SECTIONS.contains(key))
        .collect()
}

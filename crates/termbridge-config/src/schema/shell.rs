//! Shell process configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The program every session runs and the environment it starts in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell program path. Empty string means auto-detect from `$SHELL`.
    pub program: String,
    /// Arguments. Empty plus `login_shell` starts the program as a login shell.
    pub args: Vec<String>,
    /// Initial working directory. `None` means the operator's home directory.
    pub working_directory: Option<String>,
    /// Variables set on top of the (optionally inherited) environment.
    pub env: HashMap<String, String>,
    /// Launch as a login shell when no explicit `args` are given.
    pub login_shell: bool,
    /// Inherit the operator's environment before applying `env`.
    pub inherit_env: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            working_directory: None,
            env: HashMap::new(),
            login_shell: true,
            inherit_env: true,
        }
    }
}

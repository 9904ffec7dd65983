//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# termbridge configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# bind = "127.0.0.1"           # no authentication: expose with care
# port = 3000
# route = "/terminal"          # the only path that accepts upgrades
# handshake_timeout_secs = 10  # 1-120

[shell]
# program = ""                 # empty = $SHELL
# args = []                    # empty + login_shell = started as a login shell
# working_directory = "/srv"   # unset = $HOME
# login_shell = true
# inherit_env = true

[shell.env]
# EDITOR = "vim"

[terminal]
# cols = 80                    # 1-1000
# rows = 30                    # 1-1000
# term = "xterm-color"

[session]
# grace_period_ms = 3000       # 100-60000, SIGHUP -> SIGKILL escalation
# drain_timeout_ms = 200       # 0-5000, trailing output after exit
# close_timeout_ms = 1000      # 100-30000
# output_buffer_chunks = 64    # 1-4096
# input_buffer_chunks = 64     # 1-4096
# control_frames = true        # JSON resize/signal text frames
# ping_interval_ms = 30000     # 0 = off, else 1000-600000; 2 missed = dropped

[logging]
# level = "INFO"               # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}

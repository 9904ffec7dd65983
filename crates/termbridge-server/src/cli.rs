use std::path::PathBuf;

use clap::Parser;
use termbridge_config::BridgeConfig;

/// termbridge: a terminal in the browser, served over WebSocket.
#[derive(Parser, Debug, Default)]
#[command(name = "termbridge", version, about)]
pub struct Args {
    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error) or a full filter directive.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Working directory for spawned shells.
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Program to run instead of the default shell.
    #[arg(short = 'e', long)]
    pub shell: Option<String>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

/// Apply command-line overrides on top of the loaded config.
pub fn apply_overrides(args: &Args, config: &mut BridgeConfig) {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(dir) = &args.directory {
        config.shell.working_directory = Some(dir.clone());
    }
    if let Some(program) = &args.shell {
        config.shell.program = program.clone();
        config.shell.args.clear();
    }
}

/// Filter directive for the subscriber. A bare level applies to every
/// termbridge crate.
pub fn log_directive(cli_level: Option<&str>, config_level: &str) -> String {
    match cli_level {
        Some(directive) if directive.contains('=') => directive.to_string(),
        Some(level) => format!("termbridge={level}"),
        None => format!("termbridge={config_level}"),
    }
}

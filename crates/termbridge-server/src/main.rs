mod cli;

use termbridge_config::{config_to_json, load_config, load_config_from, validation, BridgeConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Loaded before logging starts so the file can set the level.
    let loaded = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let config_level = loaded
        .as_ref()
        .map(|config| config.logging.level.as_filter())
        .unwrap_or("info");

    let directive = cli::log_directive(args.log_level.as_deref(), config_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&directive))
                .unwrap_or_else(|_| EnvFilter::new("termbridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("termbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) if args.config.is_some() => {
            tracing::error!("Config error: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            BridgeConfig::default()
        }
    };
    cli::apply_overrides(&args, &mut config);
    if let Err(e) = validation::validate(&config) {
        tracing::error!("Invalid configuration: {e}");
        std::process::exit(2);
    }
    if args.print_config {
        println!("{}", config_to_json(&config));
        return;
    }

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown requested");
        trigger.cancel();
    });

    if let Err(e) = termbridge_server::run(&config, shutdown).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}

//! Narration Player (narr-ap) - Main entry point
//!
//! Serves the chunk navigation API for a reader UI and plays each chunk's
//! narration in order.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use narr_ap::api::{self, AppContext};
use narr_ap::audio::build_sink;
use narr_ap::config::{SinkKind, TomlConfig};
use narr_ap::content::{ContentSource, HttpContentSource};
use narr_ap::playback::{spawn_navigation, AudioResourceCache};
use narr_ap::SharedState;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for narr-ap
#[derive(Parser, Debug)]
#[command(name = "narr-ap")]
#[command(about = "Narrated article player")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "NARR_AP_PORT")]
    port: Option<u16>,

    /// Content server base URL (overrides config file)
    #[arg(long, env = "NARR_CONTENT_URL")]
    content_url: Option<String>,

    /// Audio output: clock or device (overrides config file)
    #[arg(long)]
    sink: Option<SinkKind>,

    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config file: --config, then NARR_CONFIG, then the OS config directory
    let location = TomlConfig::locate(args.config.as_deref());
    let mut config = TomlConfig::load(&location).context("Failed to load configuration")?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.content_url {
        config.content.base_url = url;
    }
    if let Some(sink) = args.sink {
        config.output.sink = sink;
    }

    // Initialize tracing
    let default_filter = format!(
        "narr_ap={level},narr_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting narr-ap v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    info!("Content server: {}", config.content.base_url);

    let source: Arc<dyn ContentSource> = Arc::new(
        HttpContentSource::new(&config.content.base_url, config.content.request_timeout())
            .context("Failed to create content client")?,
    );
    let sink = build_sink(&config.output).context("Failed to initialize audio output")?;

    let state = Arc::new(SharedState::new());
    let cache = Arc::new(AudioResourceCache::new());
    let (navigation, navigation_task) =
        spawn_navigation(Arc::clone(&state), Arc::clone(&source), cache, sink);

    let ctx = AppContext {
        state: Arc::clone(&state),
        navigation,
        source,
    };

    let shutdown = async move {
        shutdown_signal().await;
        state.begin_shutdown();
    };

    api::run(config.port, ctx, shutdown)
        .await
        .context("Server error")?;

    // Router (and with it the last navigation handle) is gone: the controller tears down
    navigation_task
        .await
        .context("Navigation task failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

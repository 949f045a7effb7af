//! Basalt playback node - Main entry point
//!
//! Wires the session registry, track resolver, and voice gateway together
//! and serves the HTTP control interface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use basalt_node::api::{self, AppContext};
use basalt_node::config::Config;
use basalt_node::filters::ExtensionRegistry;
use basalt_node::resolver::{HttpSourceProvider, TrackResolver};
use basalt_node::session::SessionRegistry;
use basalt_node::voice::LoopbackGateway;

/// Command-line arguments for basalt-node
#[derive(Parser, Debug)]
#[command(name = "basalt-node")]
#[command(about = "Audio-playback orchestration node")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "BASALT_PORT")]
    port: Option<u16>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "BASALT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "basalt_node=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    let config = Arc::new(config);

    info!("Starting basalt playback node on port {}", config.port);
    if !config.disabled_filters.is_empty() {
        info!("Disabled filters: {}", config.disabled_filters.join(", "));
    }

    // Wire collaborators: source providers, voice gateway, filter extensions
    let resolver = Arc::new(TrackResolver::new(
        vec![Arc::new(HttpSourceProvider::new())],
        config.resolve_timeout(),
    ));
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(LoopbackGateway),
        resolver,
        Arc::new(ExtensionRegistry::default()),
        config.clone(),
    ));

    // Build the application router
    let app = api::create_router(AppContext {
        registry,
        config: config.clone(),
    });

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    // Create and run the server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

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

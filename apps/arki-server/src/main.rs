//! ARKI Server
//!
//! HTTP backend that flattens PDFs into image-only documents or re-issues
//! them with restrictive permissions.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arki_server::config::Config;
use arki_server::pipeline::PdfiumRasterizer;
use arki_server::routes;
use arki_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the log filter is read
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "arki_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting ARKI server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload directory: {}", config.storage.upload_dir.display());
    tracing::info!("Processed directory: {}", config.storage.processed_dir.display());
    tracing::info!("Flatten DPI: {}", config.pipeline.flatten_dpi);

    // Fail here rather than inside the first request
    let library = config
        .pipeline
        .resolve_pdfium_library()
        .context("Rasterization engine unavailable; set PDFIUM_LIBRARY_PATH to the pdfium library or its directory")?;
    let rasterizer = PdfiumRasterizer::bind(&library)
        .with_context(|| format!("Failed to load pdfium from {}", library.display()))?;

    let state = AppState::new(config.clone(), Arc::new(rasterizer));
    state
        .prepare()
        .await
        .context("Failed to create storage directories")?;

    let app = routes::app(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid HOST '{}'", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!("ARKI server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

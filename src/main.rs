use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use h5p_content_api::config::{self, AppConfig, StorageBackend};
use h5p_content_api::{app, build_state};

#[derive(Parser, Debug)]
#[command(name = "h5p-content-api", version, about = "H5P content save and storage API")]
struct Args {
    #[arg(long, help = "Port to listen on (overrides H5P_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Directory holding stored content (overrides H5P_CONTENT_PATH)")]
    content_path: Option<PathBuf>,

    #[arg(long, help = "Storage backend: file or memory (overrides H5P_STORAGE)")]
    storage: Option<StorageBackend>,

    #[arg(long, help = "Public base URL used in embed codes (overrides H5P_PUBLIC_URL)")]
    public_url: Option<String>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(content_path) = self.content_path {
            config.content.content_path = content_path;
        }
        if let Some(storage) = self.storage {
            config.content.storage = storage;
        }
        if let Some(public_url) = self.public_url {
            config.server.public_url = public_url;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up H5P_CONTENT_PATH, H5P_STORAGE, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = config::config().clone();
    Args::parse().apply(&mut config);
    tracing::info!("Starting H5P content API in {:?} mode", config.environment);

    let state = build_state(&config)
        .await
        .context("failed to open content storage")?;
    let app = app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(
        "H5P content API listening on http://{} ({:?} storage)",
        bind_addr,
        config.content.storage
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

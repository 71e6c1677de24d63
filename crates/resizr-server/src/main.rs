//! Resizr server entrypoint.

use anyhow::Context;
use clap::Parser;
use resizr_api::{AppState, Pipeline, build_app};
use resizr_cache::FilesystemStore;
use resizr_fetch::{FetchConfig, HttpFetcher};
use resizr_transform::{FirTransformer, ResizeEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Overrides, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "resizr=info,tower_http=info";

#[derive(Parser)]
#[command(name = "resizr")]
#[command(author, version, about = "On-demand image resizing proxy", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "RESIZR_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = ServerConfig::load(cli.config.as_deref(), cli.overrides)?;

    let store = FilesystemStore::new(&config.cache_dir);
    store
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create cache dir {}", config.cache_dir.display()))?;

    let fetcher = HttpFetcher::new(FetchConfig {
        timeout: config.fetch_timeout(),
        ..Default::default()
    })?;
    let engine = ResizeEngine::new(Arc::new(FirTransformer::new()), config.jpeg_quality)
        .with_limits(config.resize_limits());
    let pipeline = Pipeline::new(Arc::new(store), Arc::new(fetcher), Arc::new(engine));
    let app = build_app(Arc::new(AppState::new(Arc::new(pipeline))));

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        addr = %addr,
        cache_dir = %config.cache_dir.display(),
        jpeg_quality = config.jpeg_quality,
        max_dimension = config.max_dimension,
        "Resizr listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

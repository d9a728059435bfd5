// EventFinder - HTTP server entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use eventfinder::services::plugins::PluginWatcher;
use eventfinder::storage::ConfigService;
use eventfinder::{router, AppState, SettingsUpdate};

#[derive(Debug, Parser)]
#[command(name = "eventfinder", version, about = "Conversational event discovery server")]
struct Args {
    /// Config file (default: ~/.eventfinder/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `bind_addr`
    #[arg(long)]
    bind: Option<String>,

    /// Plugin definition directory, overrides `plugins_dir`
    #[arg(long)]
    plugins_dir: Option<PathBuf>,

    /// Do not reload plugins when their definitions change
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config_service = match &args.config {
        Some(path) => ConfigService::open(path),
        None => ConfigService::new(),
    }
    .context("failed to load configuration")?;
    tracing::info!("[config] Using {}", config_service.path().display());

    let mut config = config_service.snapshot();
    config.apply_update(SettingsUpdate {
        bind_addr: args.bind,
        plugins_dir: args.plugins_dir,
        watch_plugins: args.no_watch.then_some(false),
        ..Default::default()
    });
    config.validate().map_err(anyhow::Error::msg)?;

    let plugins_dir = match &config.plugins_dir {
        Some(dir) => dir.clone(),
        None => config_service.plugins_dir()?,
    };
    let bind_addr = config.bind_addr.clone();
    let watch_plugins = config.watch_plugins;

    let state = Arc::new(AppState::build(
        config,
        plugins_dir,
        config_service.provider_config(),
    )?);

    let report = state.loader().discover().await;
    if report.loaded.is_empty() {
        tracing::warn!(
            "[plugins] No plugins loaded from {}; searches will find nothing",
            state.loader().dir().display()
        );
    }

    let mut watcher = PluginWatcher::new(state.loader().clone());
    if watch_plugins {
        if let Err(e) = watcher.start() {
            tracing::warn!("[plugins] Hot reload disabled: {}", e);
        }
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("[server] Shutdown requested");
            }
            shutdown.cancel();
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("[server] Listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server error")?;

    watcher.stop();
    Ok(())
}

//! shaperd: supervises the traffic-shaping engine and keeps its resources in sync

mod daemon {
    pub mod config;
}

use anyhow::Context;
use daemon::config::DaemonConfig;
use shaper_engine::{App, AppContext};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DaemonConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    config.validate().map_err(anyhow::Error::msg)?;

    info!(
        home = %config.home.display(),
        self_update = config.self_update,
        version = env!("CARGO_PKG_VERSION"),
        "Starting shaperd"
    );

    let ctx = AppContext::new(config.app_options()).context("failed to wire application")?;
    let app = App::new(ctx);
    let shutdown = app.shutdown_token();

    app.start().await.context("startup failed")?;

    tokio::select! {
        _ = shutdown.cancelled() => info!("Shutdown requested"),
        _ = shutdown_signal() => info!("Received termination signal"),
    }

    app.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

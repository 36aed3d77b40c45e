use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

use carousel_backend::SystemNetworkStats;
use carousel_frontend::app::run_indicator;
use carousel_frontend::config::ConfigManager;
use carousel_frontend::renderer::IconRenderer;
use carousel_frontend::theme::SystemThemeProvider;

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from CLI and environment
    let config_manager = ConfigManager::from_cli_and_env()?;
    config_manager.validate()?;
    config_manager.init_logging()?;
    let config = &config_manager.app;

    info!(
        "Starting traffic-carousel, publishing to {}",
        config.output_dir.display()
    );

    let renderer = IconRenderer::from_theme(&SystemThemeProvider);
    run_indicator(
        config,
        SystemNetworkStats::new(),
        renderer,
        wait_for_shutdown(),
    )
    .await?;

    info!("traffic-carousel stopped");
    Ok(())
}

//! Process wiring: publish the indicator, run both loops, tear down.

use std::future::Future;

use anyhow::{Context, Result};
use carousel_backend::utils::supervisor::join_loop;
use carousel_backend::{NetworkStatsProvider, RateSampler};
use carousel_shared::{DEFAULT_TOOLTIP, TooltipSink, ratio_channel};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::motion::MotionEngine;
use crate::renderer::IconRenderer;
use crate::surface::FileIndicator;

/// Run the indicator until `shutdown` resolves.
///
/// The loops are cancelled and joined and the published files removed
/// whether `shutdown` resolves with `Ok` or with an error; the error is
/// returned afterwards.
pub async fn run_indicator<P, F>(
    config: &AppConfig,
    provider: P,
    renderer: IconRenderer,
    shutdown: F,
) -> Result<()>
where
    P: NetworkStatsProvider + 'static,
    F: Future<Output = Result<()>>,
{
    let indicator = FileIndicator::create(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    indicator
        .set_tooltip(DEFAULT_TOOLTIP)
        .context("Failed to publish initial tooltip")?;

    let (publisher, reader) = ratio_channel();
    let cancel = CancellationToken::new();

    let mut sampler = RateSampler::new(provider, publisher, indicator.clone())
        .with_interval(config.sample_interval);
    let mut engine = MotionEngine::new(renderer, indicator.clone(), reader)
        .with_interval(config.frame_interval);

    let sampler_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { sampler.run(cancel).await }
    });
    let motion_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });

    let shutdown_result = shutdown.await;
    match &shutdown_result {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!("Shutdown listener failed, stopping: {:#}", e),
    }
    cancel.cancel();

    let sampler_ok = join_loop("sampler", sampler_task).await;
    let motion_ok = join_loop("motion", motion_task).await;
    if !(sampler_ok && motion_ok) {
        warn!("A loop did not stop cleanly");
    }

    let cleared = indicator
        .clear()
        .context("Failed to remove published indicator files");

    shutdown_result?;
    cleared
}

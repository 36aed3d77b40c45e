//! Motion engine: the ~30 Hz loop that turns the latest throughput ratio into
//! rotating arcs.
//!
//! Each direction runs an asymmetric controller. Speed rises proportionally
//! toward `MAX_SPEED * ratio`, falls by a constant [`FRICTION`] otherwise, and
//! snaps to exactly zero inside the deadband so an idle icon settles instead
//! of creeping forever.
//!
//! While both directions are at rest no frame is rendered and the installed
//! icon is left alone.

use std::time::Duration;

use carousel_backend::utils::supervisor::catch_tick;
use carousel_shared::{CarouselResult, RatioReader, ThroughputRatio};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::renderer::{IconRenderer, RenderRequest};
use crate::surface::IconSurface;

/// Speed reached at a ratio of 1.0, in degrees per tick
pub const MAX_SPEED: f64 = 150.0;
/// Fraction of the remaining distance to target covered per rising tick
pub const APPROACH_GAIN: f64 = 0.4;
/// Constant deceleration per tick; also the deadband threshold
pub const FRICTION: f64 = 1.5;
/// Extra arc sweep per unit of speed
pub const SWEEP_GAIN: f64 = 0.4;
/// Default frame period
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Speed and rotation of one arc.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionMotion {
    speed: f64,
    displacement: f64,
}

impl DirectionMotion {
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn is_moving(&self) -> bool {
        self.speed != 0.0
    }

    /// Update the speed toward the target derived from `ratio`.
    pub fn advance(&mut self, ratio: f64) {
        let target = MAX_SPEED * ratio;
        let delta = target - self.speed;

        if delta > 0.0 {
            self.speed += delta * APPROACH_GAIN;
        } else {
            self.speed -= FRICTION;
        }

        if self.speed < FRICTION {
            self.speed = 0.0;
        }
    }

    /// Move the arc by the current speed, wrapping at a full turn
    pub fn rotate(&mut self) {
        self.displacement = (self.displacement + self.speed).rem_euclid(360.0);
    }

    /// Sweep added on top of the base arc
    pub fn sweep_extension(&self) -> f64 {
        self.speed * SWEEP_GAIN
    }
}

/// Motion of both arcs: download drives the outer one, upload the inner one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub download: DirectionMotion,
    pub upload: DirectionMotion,
}

impl MotionState {
    /// Advance one tick. Returns the frame to draw, or `None` when both arcs
    /// are at rest.
    pub fn step(&mut self, ratio: ThroughputRatio) -> Option<RenderRequest> {
        self.download.advance(ratio.download());
        self.upload.advance(ratio.upload());

        if !self.download.is_moving() && !self.upload.is_moving() {
            return None;
        }

        self.download.rotate();
        self.upload.rotate();
        Some(self.render_request())
    }

    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            outer_start: self.download.displacement,
            outer_extend: self.download.sweep_extension(),
            inner_start: self.upload.displacement,
            inner_extend: self.upload.sweep_extension(),
        }
    }
}

/// Owns the motion state and the single live icon.
pub struct MotionEngine<S: IconSurface> {
    renderer: IconRenderer,
    surface: S,
    reader: RatioReader,
    state: MotionState,
    icon: Option<S::Icon>,
    interval: Duration,
}

impl<S: IconSurface> MotionEngine<S> {
    pub fn new(renderer: IconRenderer, surface: S, reader: RatioReader) -> Self {
        Self {
            renderer,
            surface,
            reader,
            state: MotionState::default(),
            icon: None,
            interval: FRAME_INTERVAL,
        }
    }

    /// Override the frame period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The icon currently installed, if any
    pub fn live_icon(&self) -> Option<&S::Icon> {
        self.icon.as_ref()
    }

    /// Install the at-rest frame.
    pub async fn show_idle_icon(&mut self) -> CarouselResult<()> {
        self.replace_icon(&RenderRequest::IDLE).await
    }

    /// Run one frame. Returns whether a new icon was installed.
    pub async fn tick(&mut self) -> CarouselResult<bool> {
        let ratio = self.reader.latest();
        match self.state.step(ratio) {
            Some(request) => {
                trace!(?request, "Rendering frame");
                self.replace_icon(&request).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_icon(&mut self, request: &RenderRequest) -> CarouselResult<()> {
        // Release before creating so two icons are never alive together
        self.icon = None;

        let bitmap = self.renderer.render(request);
        let icon = self.surface.create_icon(bitmap).await?;
        self.surface.install_icon(&icon).await?;
        self.icon = Some(icon);
        Ok(())
    }

    /// Drop the installed icon
    pub fn release_icon(&mut self) {
        if self.icon.take().is_some() {
            debug!("Released icon");
        }
    }

    /// Animate until `cancel` fires, then release the icon.
    #[instrument(skip_all, fields(service = "motion", interval = ?self.interval))]
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!("Motion engine started");

        if let Err(e) = self.show_idle_icon().await {
            warn!("Failed to install initial icon: {}", e);
        }

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(Err(e)) = catch_tick("motion", self.tick()).await {
                        warn!("Failed to update icon: {}", e);
                    }
                }
            }
        }

        self.release_icon();
        info!("Motion engine stopped");
    }
}

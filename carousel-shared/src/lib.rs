//! Shared types and channels for Traffic Carousel.
//!
//! This crate contains the data structures that cross the boundary between the
//! rate sampler (backend) and the animation loop (frontend). The two loops are
//! scheduled independently and only ever exchange one value: the most recent
//! [`ThroughputRatio`] pair.
//!
//! # Key Components
//!
//! * [`ratio`] - Normalized throughput pair and its latest-value channel
//! * [`errors`] - Error types shared by both sides
//! * [`TooltipSink`] - Indicator host surface that receives the rate tooltip
//!
//! # Data Flow
//!
//! ```text
//! Sampler (1 Hz)                     Motion Engine (~30 Hz)
//!    │ ── publish(ThroughputRatio) ──► │ latest()
//!    │                                 │ ──► Renderer ──► IconSurface
//!    │ ── set_tooltip("U: .. D: ..") ──► Indicator host
//! ```

pub mod errors;
pub mod ratio;

pub use errors::{CarouselError, CarouselResult};
pub use ratio::{
    MAX_BYTES_PER_TICK, RatioPublisher, RatioReader, ThroughputRatio, ratio_channel,
};

/// Tooltip shown before the first rate sample is available
pub const DEFAULT_TOOLTIP: &str = "Traffic Carousel";

/// Receives the human readable rate summary shown next to the icon.
///
/// Called from the sampler task, so implementations must be shareable across
/// tasks. Failures are reported but never stop the sampler.
pub trait TooltipSink: Send + Sync {
    fn set_tooltip(&self, text: &str) -> CarouselResult<()>;
}

impl<T: TooltipSink + ?Sized> TooltipSink for std::sync::Arc<T> {
    fn set_tooltip(&self, text: &str) -> CarouselResult<()> {
        (**self).set_tooltip(text)
    }
}

//! Traffic Carousel frontend.
//!
//! Turns the published throughput ratio into motion and pixels: the motion
//! engine smooths ratios into angular speeds, the renderer draws two arcs, and
//! an [`surface::IconSurface`] turns the bitmap into whatever the indicator
//! host displays.

pub mod app;
pub mod config;
pub mod motion;
pub mod renderer;
pub mod surface;
pub mod theme;

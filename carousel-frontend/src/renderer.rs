//! Icon renderer: two concentric arcs on a transparent square canvas.
//!
//! Angles are in degrees, measured clockwise from the positive x axis in
//! screen coordinates (y grows downward). Each arc always spans at least
//! [`BASE_SWEEP`] degrees, leaving a gap that makes the rotation visible.
//!
//! Pixels are filled without anti-aliasing: a pixel belongs to an arc when its
//! centre lies inside the stroke band and inside the swept angle, so the caps
//! are flat and the output only depends on the inputs.

use image::{Rgba, RgbaImage};

use crate::theme::{ThemeProvider, resolve_stroke};

/// Canvas edge length in pixels
pub const CANVAS_SIZE: u32 = 256;
/// Stroke width in pixels
pub const STROKE_WIDTH: f64 = 25.0;
/// Sweep of an arc with no extension
pub const BASE_SWEEP: f64 = 280.0;

/// Outer arc bounding box (download)
pub const OUTER_BOUNDS: ArcBounds = ArcBounds {
    x: 30.0,
    y: 30.0,
    size: 196.0,
};
/// Inner arc bounding box (upload)
pub const INNER_BOUNDS: ArcBounds = ArcBounds {
    x: 75.0,
    y: 75.0,
    size: 106.0,
};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Square bounding box of a circular arc
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcBounds {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl ArcBounds {
    fn center(&self) -> (f64, f64) {
        (self.x + self.size / 2.0, self.y + self.size / 2.0)
    }

    fn radius(&self) -> f64 {
        self.size / 2.0
    }
}

/// The four angles of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderRequest {
    pub outer_start: f64,
    pub outer_extend: f64,
    pub inner_start: f64,
    pub inner_extend: f64,
}

impl RenderRequest {
    /// Both arcs at rest
    pub const IDLE: Self = Self {
        outer_start: 0.0,
        outer_extend: 0.0,
        inner_start: 0.0,
        inner_extend: 0.0,
    };
}

/// Draws carousel frames with a stroke color fixed at construction.
#[derive(Debug, Clone)]
pub struct IconRenderer {
    stroke: Rgba<u8>,
}

impl IconRenderer {
    pub fn new(stroke: Rgba<u8>) -> Self {
        Self { stroke }
    }

    /// Query the theme once and keep the resulting stroke
    pub fn from_theme(provider: &dyn ThemeProvider) -> Self {
        Self::new(resolve_stroke(provider))
    }

    pub fn stroke(&self) -> Rgba<u8> {
        self.stroke
    }

    pub fn render(&self, request: &RenderRequest) -> RgbaImage {
        self.draw(
            request.outer_start,
            request.outer_extend,
            request.inner_start,
            request.inner_extend,
        )
    }

    pub fn draw(
        &self,
        outer_start: f64,
        outer_extend: f64,
        inner_start: f64,
        inner_extend: f64,
    ) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, TRANSPARENT);
        stroke_arc(
            &mut canvas,
            OUTER_BOUNDS,
            outer_start,
            BASE_SWEEP + outer_extend,
            self.stroke,
        );
        stroke_arc(
            &mut canvas,
            INNER_BOUNDS,
            inner_start,
            BASE_SWEEP + inner_extend,
            self.stroke,
        );
        canvas
    }
}

/// Whether `angle` lies on the arc starting at `start` and sweeping `sweep`
/// degrees (negative sweeps run counter-clockwise).
fn angle_on_arc(angle: f64, start: f64, sweep: f64) -> bool {
    if sweep.abs() >= 360.0 {
        return true;
    }
    let (from, span) = if sweep >= 0.0 {
        (start, sweep)
    } else {
        (start + sweep, -sweep)
    };
    (angle - from).rem_euclid(360.0) <= span
}

fn stroke_arc(
    canvas: &mut RgbaImage,
    bounds: ArcBounds,
    start: f64,
    sweep: f64,
    color: Rgba<u8>,
) {
    if !start.is_finite() || !sweep.is_finite() {
        return;
    }

    let (cx, cy) = bounds.center();
    let radius = bounds.radius();
    let half_width = STROKE_WIDTH / 2.0;
    let inner = radius - half_width;
    let outer = radius + half_width;

    let limit = f64::from(canvas.width());
    let min_x = (cx - outer).floor().clamp(0.0, limit) as u32;
    let max_x = (cx + outer).ceil().clamp(0.0, limit) as u32;
    let min_y = (cy - outer).floor().clamp(0.0, limit) as u32;
    let max_y = (cy + outer).ceil().clamp(0.0, limit) as u32;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let dx = f64::from(x) + 0.5 - cx;
            let dy = f64::from(y) + 0.5 - cy;
            let distance = dx.hypot(dy);
            if distance < inner || distance >= outer {
                continue;
            }

            let angle = dy.atan2(dx).to_degrees().rem_euclid(360.0);
            if angle_on_arc(angle, start, sweep) {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

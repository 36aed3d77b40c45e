//! Desktop theme detection for the icon stroke color.
//!
//! The theme is read once when the renderer is built and never refreshed; a
//! theme switch while running keeps the first stroke until restart.
//! A light panel gets a black stroke. A dark panel, or a theme that cannot be
//! determined, gets a white stroke.
//! Descriptions that pair the dark theme with a black stroke name the light
//! variant's color; the stroke here always contrasts with the panel.

use std::env;
use std::process::Command;

use image::Rgba;
use tracing::{debug, info};

/// Stroke used on light panels
pub const LIGHT_THEME_STROKE: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Stroke used on dark panels and when the theme is unknown
pub const DARK_THEME_STROKE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Theme mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn stroke_color(&self) -> Rgba<u8> {
        match self {
            ThemeMode::Light => LIGHT_THEME_STROKE,
            ThemeMode::Dark => DARK_THEME_STROKE,
        }
    }
}

/// One-shot "uses light theme" query.
pub trait ThemeProvider {
    /// `None` when the desktop does not say
    fn uses_light_theme(&self) -> Option<bool>;
}

/// A fixed answer, for tests and headless setups
#[derive(Debug, Clone, Copy)]
pub struct StaticTheme(pub Option<bool>);

impl ThemeProvider for StaticTheme {
    fn uses_light_theme(&self) -> Option<bool> {
        self.0
    }
}

/// Resolve the stroke color from a provider.
pub fn resolve_stroke(provider: &dyn ThemeProvider) -> Rgba<u8> {
    match provider.uses_light_theme() {
        Some(true) => ThemeMode::Light.stroke_color(),
        Some(false) => ThemeMode::Dark.stroke_color(),
        None => {
            info!("Desktop theme unknown, using the white stroke");
            DARK_THEME_STROKE
        }
    }
}

/// Reads `GTK_THEME`, then the GNOME `color-scheme` setting.
#[derive(Debug, Clone, Default)]
pub struct SystemThemeProvider;

impl ThemeProvider for SystemThemeProvider {
    fn uses_light_theme(&self) -> Option<bool> {
        if let Some(light) = env::var("GTK_THEME").ok().and_then(|v| parse_gtk_theme(&v)) {
            debug!("Theme from GTK_THEME: light={}", light);
            return Some(light);
        }

        let output = Command::new("gsettings")
            .args(["get", "org.gnome.desktop.interface", "color-scheme"])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let light = parse_color_scheme(&String::from_utf8_lossy(&output.stdout));
                debug!("Theme from gsettings color-scheme: light={:?}", light);
                light
            }
            Ok(output) => {
                debug!(
                    "gsettings failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                debug!("gsettings not available: {}", e);
                None
            }
        }
    }
}

/// `Adwaita:dark` style theme names; empty means unset.
pub fn parse_gtk_theme(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(!value.to_lowercase().contains("dark"))
}

/// Output of `gsettings get org.gnome.desktop.interface color-scheme`.
pub fn parse_color_scheme(value: &str) -> Option<bool> {
    match value.trim().trim_matches('\'') {
        "prefer-dark" => Some(false),
        "prefer-light" | "default" => Some(true),
        _ => None,
    }
}

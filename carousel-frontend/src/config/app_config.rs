//! Application configuration for Traffic Carousel.
//!
//! Combines the command line with the environment (`RUST_LOG`, the XDG
//! directories) and owns logging initialization.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use carousel_backend::sampler::SAMPLE_INTERVAL;
use tracing_subscriber::EnvFilter;

use super::cli::CliConfig;
use crate::motion::FRAME_INTERVAL;

/// Directory name used under the runtime or cache directory
pub const APP_DIR_NAME: &str = "traffic-carousel";

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: LogLevel,
    /// Raw `RUST_LOG` directives, kept when they are more specific than a level
    pub log_directives: Option<String>,
    pub output_dir: PathBuf,
    pub sample_interval: Duration,
    pub frame_interval: Duration,
}

impl AppConfig {
    /// Create application configuration from CLI config and the environment
    pub fn from_cli(cli_config: &CliConfig) -> Result<Self> {
        let rust_log = env::var("RUST_LOG").ok().filter(|value| !value.is_empty());
        let output_dir = match &cli_config.output_dir {
            Some(dir) => dir.clone(),
            None => default_output_dir().context("No runtime or cache directory available")?,
        };
        Ok(Self::from_parts(cli_config, rust_log, output_dir))
    }

    fn from_parts(cli_config: &CliConfig, rust_log: Option<String>, output_dir: PathBuf) -> Self {
        let (log_level, log_directives) = if cli_config.verbose {
            (LogLevel::Debug, None)
        } else {
            match rust_log {
                Some(value) => (Self::parse_log_level(&value), Some(value)),
                None => (LogLevel::Info, None),
            }
        };

        Self {
            log_level,
            log_directives,
            output_dir,
            sample_interval: SAMPLE_INTERVAL,
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Parse log level from string
    fn parse_log_level(level_str: &str) -> LogLevel {
        // Extract the main log level from complex RUST_LOG format
        let main_level = level_str
            .split(',')
            .next()
            .unwrap_or(level_str)
            .split('=')
            .next()
            .unwrap_or(level_str)
            .to_lowercase();

        match main_level.as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    /// Filter directives handed to the subscriber
    pub fn log_filter(&self) -> String {
        match &self.log_directives {
            Some(directives) => directives.clone(),
            None => self.log_level.to_filter_string().to_string(),
        }
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        let filter = EnvFilter::try_new(self.log_filter())
            .or_else(|_| EnvFilter::try_new(self.log_level.to_filter_string()))
            .context("Invalid log filter")?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        tracing::info!("Logging initialized with level: {:?}", self.log_level);
        Ok(())
    }

    /// Validate application configuration
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Output directory cannot be empty"));
        }

        if self.sample_interval.is_zero() {
            return Err(anyhow::anyhow!("Sample interval must be greater than 0"));
        }

        if self.frame_interval.is_zero() {
            return Err(anyhow::anyhow!("Frame interval must be greater than 0"));
        }

        Ok(())
    }
}

/// `$XDG_RUNTIME_DIR/traffic-carousel`, falling back to the user cache directory
pub fn default_output_dir() -> Option<PathBuf> {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(verbose: bool, rust_log: Option<&str>) -> AppConfig {
        let cli_config = CliConfig {
            verbose,
            output_dir: None,
        };
        AppConfig::from_parts(
            &cli_config,
            rust_log.map(str::to_string),
            PathBuf::from("/tmp/traffic-carousel"),
        )
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(AppConfig::parse_log_level("info"), LogLevel::Info);
        assert_eq!(AppConfig::parse_log_level("debug"), LogLevel::Debug);
        assert_eq!(AppConfig::parse_log_level("WARN"), LogLevel::Warn);
        assert_eq!(AppConfig::parse_log_level("error"), LogLevel::Error);
        assert_eq!(AppConfig::parse_log_level("trace"), LogLevel::Trace);
        assert_eq!(AppConfig::parse_log_level("invalid"), LogLevel::Info);
        assert_eq!(
            AppConfig::parse_log_level("debug,carousel_backend=trace"),
            LogLevel::Debug
        );
    }

    #[test]
    fn test_verbose_overrides_environment() {
        let app_config = config(true, Some("warn"));
        assert_eq!(app_config.log_level, LogLevel::Debug);
        assert_eq!(app_config.log_filter(), "debug");
    }

    #[test]
    fn test_rust_log_directives_are_kept() {
        let app_config = config(false, Some("warn,carousel_frontend::motion=trace"));
        assert_eq!(app_config.log_level, LogLevel::Warn);
        assert_eq!(
            app_config.log_filter(),
            "warn,carousel_frontend::motion=trace"
        );

        let app_config = config(false, None);
        assert_eq!(app_config.log_level, LogLevel::Info);
        assert_eq!(app_config.log_filter(), "info");
    }

    #[test]
    fn test_default_intervals() {
        let app_config = config(false, None);
        assert_eq!(app_config.sample_interval, Duration::from_secs(1));
        assert_eq!(app_config.frame_interval, Duration::from_millis(33));
        assert!(app_config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_intervals() {
        let mut app_config = config(false, None);
        app_config.sample_interval = Duration::ZERO;
        assert!(app_config.validate().is_err());

        let mut app_config = config(false, None);
        app_config.frame_interval = Duration::ZERO;
        assert!(app_config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_output_dir() {
        let mut app_config = config(false, None);
        app_config.output_dir = PathBuf::new();
        assert!(app_config.validate().is_err());
    }

    #[test]
    fn test_explicit_output_dir_wins() {
        let cli_config = CliConfig {
            verbose: true,
            output_dir: Some(PathBuf::from("/srv/carousel")),
        };
        let app_config = AppConfig::from_cli(&cli_config).unwrap();
        assert_eq!(app_config.output_dir, PathBuf::from("/srv/carousel"));
    }
}

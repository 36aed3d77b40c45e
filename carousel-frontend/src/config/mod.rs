//! Configuration for Traffic Carousel.
//!
//! - CLI argument parsing
//! - Environment (`RUST_LOG`, XDG directories)
//! - Validation and logging setup

pub mod app_config;
pub mod cli;

pub use app_config::{AppConfig, LogLevel, default_output_dir};
pub use cli::CliConfig;

use anyhow::Result;

/// Combines all configuration sources
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub app: AppConfig,
}

impl ConfigManager {
    /// Creates a new configuration manager from CLI arguments and environment
    pub fn from_cli_and_env() -> Result<Self> {
        let cli_config = CliConfig::from_args()?;
        Self::from_cli(&cli_config)
    }

    pub fn from_cli(cli_config: &CliConfig) -> Result<Self> {
        Ok(Self {
            app: AppConfig::from_cli(cli_config)?,
        })
    }

    /// Validates the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.app.validate()
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        self.app.init_logging()
    }
}

//! CLI argument parsing for Traffic Carousel.
//!
//! The indicator has no behavioral options; the command line only carries
//! ambient settings (log verbosity and where the file indicator publishes).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

/// Parsed command line arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub verbose: bool,
    pub output_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Parse CLI arguments and create CliConfig
    pub fn from_args() -> Result<Self> {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    /// Create CliConfig from pre-parsed ArgMatches (useful for testing)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let verbose = matches.get_flag("verbose");
        let output_dir = matches.get_one::<PathBuf>("output-dir").cloned();

        Ok(Self {
            verbose,
            output_dir,
        })
    }

    /// Build the clap Command structure
    pub fn build_cli() -> Command {
        Command::new("traffic-carousel")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Traffic Carousel - animated network throughput indicator")
            .long_about(
                "Shows the throughput of the active network adapter as two rotating arcs. \
                 The outer arc follows download traffic, the inner arc upload traffic; \
                 both spin faster as the link gets busier.",
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue)
                    .help("Enable verbose logging")
                    .long_help(
                        "Enable debug logging, including adapter selection and every \
                         sampled rate.",
                    ),
            )
            .arg(
                Arg::new("output-dir")
                    .long("output-dir")
                    .value_name("DIR")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Directory where icon.png and tooltip.txt are published")
                    .long_help(
                        "Directory where the current icon (icon.png) and tooltip \
                         (tooltip.txt) are published for the status bar. Defaults to \
                         $XDG_RUNTIME_DIR/traffic-carousel, or the user cache directory.",
                    )
                    .required(false),
            )
    }
}

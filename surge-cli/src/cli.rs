//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Spike-test an HTTP service", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a spike test: baseline, spike, recovery, then analysis
    Run {
        /// Override the target base URL
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Report path template ({{run_id}}, {{timestamp}}, {{status}}); "-" for stdout
        #[arg(long, value_name = "PATH")]
        output: Option<String>,

        /// Report format: json, json_compact, yaml
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Skip the console summary
        #[arg(long)]
        no_summary: bool,
    },

    /// Validate a configuration file without running anything
    Validate,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration (file plus environment overrides)
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}

//! Domain-specific configuration modules

pub mod http;
pub mod logging;
pub mod output;
pub mod spike;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Surge configuration combining all domains
///
/// The `spike` domain is required in a configuration file; the remaining
/// domains fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SurgeConfig {
    /// Load shape, target and scenarios of the spike test
    pub spike: spike::SpikeConfig,

    /// HTTP client configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Report output configuration
    #[serde(default)]
    pub output: output::OutputConfig,
}

impl SurgeConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.spike.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        self.output.validate()?;

        for warning in self.http.load_warnings(&self.spike) {
            log::warn!("{}", warning);
        }
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SurgeConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}

//! Report output configuration

use crate::error::ConfigResult;
use crate::validation::{validate_enum_choice, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Report formats understood by the report writers
pub const REPORT_FORMATS: &[&str] = &["json", "json_compact", "yaml"];

/// Where and how the spike test report is written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report path template. Supports `{{run_id}}` and `{{timestamp}}`.
    /// `None` writes the report to stdout only.
    #[serde(default = "default_report_path")]
    pub path: Option<String>,

    /// Report format: json, json_compact, yaml
    #[serde(default = "default_report_format")]
    pub format: String,

    /// Create parent directories of the report path
    #[serde(default = "crate::domains::utils::default_true")]
    pub create_dirs: bool,

    /// Overwrite an existing report file
    #[serde(default = "crate::domains::utils::default_false")]
    pub overwrite: bool,

    /// Print a human-readable summary after the run
    #[serde(default = "crate::domains::utils::default_true")]
    pub print_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            format: default_report_format(),
            create_dirs: true,
            overwrite: false,
            print_summary: true,
        }
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref path) = self.path {
            validate_required_string(path, "path", self.domain_name())?;
        }

        validate_enum_choice(&self.format, REPORT_FORMATS, "format", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "output"
    }
}

fn default_report_path() -> Option<String> {
    Some("reports/spike-test-{{timestamp}}.json".to_string())
}

fn default_report_format() -> String {
    "json".to_string()
}

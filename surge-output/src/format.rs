//! Report serialization formats

use crate::errors::ReportWriteError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    JsonCompact,
    Yaml,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::JsonCompact => "json_compact",
            ReportFormat::Yaml => "yaml",
        }
    }

    /// Serialize `value` in this format
    pub fn render<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ReportWriteError> {
        let serialization_error = |error: String| ReportWriteError::Serialization {
            format: self.as_str().to_string(),
            error,
        };

        match self {
            ReportFormat::Json => {
                let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| serialization_error(e.to_string()))?;
                bytes.push(b'\n');
                Ok(bytes)
            }
            ReportFormat::JsonCompact => serde_json::to_vec(value).map_err(|e| serialization_error(e.to_string())),
            ReportFormat::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| serialization_error(e.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = ReportWriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "json_compact" => Ok(ReportFormat::JsonCompact),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            _ => Err(ReportWriteError::UnsupportedFormat(s.to_string())),
        }
    }
}

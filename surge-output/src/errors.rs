//! Error types for report writing

use thiserror::Error;

/// Persisting a report failed. The computed results stay valid.
#[derive(Error, Debug)]
pub enum ReportWriteError {
    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to serialize report as {format}: {error}")]
    Serialization { format: String, error: String },

    #[error("Template rendering failed for '{template}': {error}")]
    TemplateRender { template: String, error: String },

    #[error("Report file already exists: {path}")]
    FileExists { path: String },

    #[error("Filesystem error during {operation} at {path}: {error}")]
    Filesystem {
        path: String,
        operation: String,
        error: String,
    },

    #[error("Failed to write report to {stream}: {error}")]
    Stream { stream: String, error: String },
}

//! Filesystem report writer

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use surge_config::OutputConfig;
use surge_engine::SpikeTestReport;
use tokio::fs;
use tracing::debug;

use crate::{
    errors::ReportWriteError,
    format::ReportFormat,
    template::TemplateEngine,
    writer::{ReportWriter, WriteOutcome},
};

/// Configuration for the filesystem writer
#[derive(Debug, Clone)]
pub struct FilesystemConfig {
    /// Supports `{{run_id}}`, `{{timestamp}}` and `{{status}}`
    pub path_template: String,
    pub format: ReportFormat,
    pub create_dirs: bool,
    pub overwrite: bool,
}

/// Writes reports to a file whose path is rendered per run
#[derive(Debug)]
pub struct FilesystemReportWriter {
    config: FilesystemConfig,
    template_engine: TemplateEngine,
}

impl FilesystemReportWriter {
    pub fn new(config: FilesystemConfig) -> Result<Self, ReportWriteError> {
        let template_engine = TemplateEngine::new();
        if config.path_template.trim().is_empty() {
            return Err(ReportWriteError::Filesystem {
                path: config.path_template.clone(),
                operation: "validate".to_string(),
                error: "Report path cannot be empty".to_string(),
            });
        }
        template_engine.validate(&config.path_template)?;

        Ok(Self {
            config,
            template_engine,
        })
    }

    /// Build a writer from output configuration; `None` when no path is set
    pub fn from_config(config: &OutputConfig) -> Result<Option<Self>, ReportWriteError> {
        let Some(path) = &config.path else {
            return Ok(None);
        };

        Self::new(FilesystemConfig {
            path_template: path.clone(),
            format: config.format.parse()?,
            create_dirs: config.create_dirs,
            overwrite: config.overwrite,
        })
        .map(Some)
    }

    /// Path the report would be written to
    pub fn resolve_path(&self, report: &SpikeTestReport) -> Result<PathBuf, ReportWriteError> {
        let mut vars = HashMap::new();
        vars.insert("run_id".to_string(), report.run_id.to_string());
        vars.insert(
            "timestamp".to_string(),
            report.started_at.format("%Y%m%d_%H%M%S").to_string(),
        );
        vars.insert(
            "status".to_string(),
            serde_json::to_value(report.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
        );

        let rendered = self.template_engine.render(&self.config.path_template, &vars)?;
        if rendered.contains('\0') {
            return Err(ReportWriteError::Filesystem {
                path: rendered,
                operation: "validate".to_string(),
                error: "Path contains null bytes".to_string(),
            });
        }

        Ok(PathBuf::from(rendered))
    }

    async fn ensure_parent(&self, path: &Path) -> Result<(), ReportWriteError> {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };

        if self.config.create_dirs {
            fs::create_dir_all(parent).await.map_err(|e| ReportWriteError::Filesystem {
                path: parent.to_string_lossy().to_string(),
                operation: "create_dirs".to_string(),
                error: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl ReportWriter for FilesystemReportWriter {
    async fn write(&self, report: &SpikeTestReport) -> Result<WriteOutcome, ReportWriteError> {
        let start_time = Instant::now();
        let path = self.resolve_path(report)?;
        let display_path = path.to_string_lossy().to_string();

        if !self.config.overwrite && fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ReportWriteError::FileExists { path: display_path });
        }

        self.ensure_parent(&path).await?;

        let data = self.config.format.render(report)?;
        fs::write(&path, &data).await.map_err(|e| ReportWriteError::Filesystem {
            path: display_path.clone(),
            operation: "write".to_string(),
            error: e.to_string(),
        })?;

        debug!(path = %display_path, bytes = data.len(), format = %self.config.format, "Report written");

        Ok(WriteOutcome {
            writer: self.writer_type(),
            location: Some(display_path),
            size_bytes: data.len() as u64,
            write_time: start_time.elapsed(),
        })
    }

    fn writer_type(&self) -> &'static str {
        "filesystem"
    }
}

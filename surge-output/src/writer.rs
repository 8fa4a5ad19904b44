//! The report writer trait

use crate::errors::ReportWriteError;
use async_trait::async_trait;
use std::time::Duration;
use surge_engine::SpikeTestReport;

/// Where and how big a written report ended up
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub writer: &'static str,
    /// File path, when written to the filesystem
    pub location: Option<String>,
    pub size_bytes: u64,
    pub write_time: Duration,
}

/// Persists a spike test report
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write(&self, report: &SpikeTestReport) -> Result<WriteOutcome, ReportWriteError>;

    /// Short name used in logs
    fn writer_type(&self) -> &'static str;
}

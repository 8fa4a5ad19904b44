//! Standard output report writer

use async_trait::async_trait;
use std::time::Instant;
use surge_engine::SpikeTestReport;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    errors::ReportWriteError,
    format::ReportFormat,
    writer::{ReportWriter, WriteOutcome},
};

/// Standard streams for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdStream {
    #[default]
    Stdout,
    Stderr,
}

impl StdStream {
    fn name(&self) -> &'static str {
        match self {
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }
}

/// Writes the serialized report to stdout or stderr
#[derive(Debug, Clone, Default)]
pub struct StdioReportWriter {
    stream: StdStream,
    format: ReportFormat,
}

impl StdioReportWriter {
    pub fn new(stream: StdStream, format: ReportFormat) -> Self {
        Self { stream, format }
    }

    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(StdStream::Stdout, format)
    }

    /// Serialize `report` into any async sink
    pub async fn write_to<W>(&self, sink: &mut W, report: &SpikeTestReport) -> Result<u64, ReportWriteError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut data = self.format.render(report)?;
        if data.last() != Some(&b'\n') {
            data.push(b'\n');
        }

        let stream_error = |e: std::io::Error| ReportWriteError::Stream {
            stream: self.stream.name().to_string(),
            error: e.to_string(),
        };
        sink.write_all(&data).await.map_err(stream_error)?;
        sink.flush().await.map_err(stream_error)?;

        Ok(data.len() as u64)
    }
}

#[async_trait]
impl ReportWriter for StdioReportWriter {
    async fn write(&self, report: &SpikeTestReport) -> Result<WriteOutcome, ReportWriteError> {
        let start_time = Instant::now();
        let size_bytes = match self.stream {
            StdStream::Stdout => self.write_to(&mut tokio::io::stdout(), report).await?,
            StdStream::Stderr => self.write_to(&mut tokio::io::stderr(), report).await?,
        };

        Ok(WriteOutcome {
            writer: self.writer_type(),
            location: None,
            size_bytes,
            write_time: start_time.elapsed(),
        })
    }

    fn writer_type(&self) -> &'static str {
        "stdio"
    }
}

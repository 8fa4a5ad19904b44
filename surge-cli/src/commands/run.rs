//! The `run` command: execute a spike test and report it

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use surge_config::SurgeConfig;
use surge_engine::{
    ChannelSink, EventSink, FanoutSink, LoadEvent, SpikeTestOrchestrator, SpikeTestPlan, SpikeTestReport,
    TracingSink,
};
use surge_http::{HttpConfig, ReqwestTransport};
use surge_output::{FilesystemReportWriter, ReportFormat, ReportWriter, StdioReportWriter};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::summary::print_summary;

/// Command-line overrides for a run
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub base_url: Option<String>,
    /// `-` writes the report to stdout
    pub output: Option<String>,
    pub format: Option<String>,
    pub no_summary: bool,
}

/// Apply overrides on top of the loaded configuration and re-validate it
pub fn apply_overrides(mut config: SurgeConfig, overrides: &RunOverrides) -> Result<SurgeConfig> {
    if let Some(base_url) = &overrides.base_url {
        config.spike.base_url = base_url.clone();
    }
    match overrides.output.as_deref() {
        Some("-") => config.output.path = None,
        Some(path) => config.output.path = Some(path.to_string()),
        None => {}
    }
    if let Some(format) = &overrides.format {
        config.output.format = format.clone();
    }
    if overrides.no_summary {
        config.output.print_summary = false;
    }

    config
        .validate_all()
        .context("Invalid configuration after applying command-line overrides")?;
    Ok(config)
}

/// Log phase boundaries as they arrive
async fn track_progress(mut events: UnboundedReceiver<LoadEvent>) -> u64 {
    let mut requests = 0u64;
    while let Some(event) = events.recv().await {
        match event {
            LoadEvent::TestStart {
                phase, concurrency, ..
            } => {
                println!("▶ {} phase: {} virtual users", phase, concurrency);
            }
            LoadEvent::RequestComplete { .. } | LoadEvent::RequestError { .. } => requests += 1,
            LoadEvent::TestComplete { result } => {
                println!(
                    "✓ {} phase: {} requests, {:.1} req/s",
                    result.phase, result.total_requests, result.throughput_req_per_sec
                );
            }
            LoadEvent::WorkerStarted { .. } => {}
        }
    }
    requests
}

async fn write_report(config: &SurgeConfig, report: &SpikeTestReport) -> Result<()> {
    let writer: Box<dyn ReportWriter> = match FilesystemReportWriter::from_config(&config.output)? {
        Some(writer) => Box::new(writer),
        None => {
            let format: ReportFormat = config.output.format.parse()?;
            Box::new(StdioReportWriter::stdout(format))
        }
    };

    let outcome = writer.write(report).await?;
    info!(
        writer = outcome.writer,
        location = ?outcome.location,
        bytes = outcome.size_bytes,
        "Report written in {:?}",
        outcome.write_time
    );
    if let Some(location) = outcome.location {
        println!("Report written to {}", location);
    }
    Ok(())
}

/// Run the spike test described by `config`
pub async fn run_command(config: SurgeConfig, overrides: RunOverrides) -> Result<()> {
    let config = apply_overrides(config, &overrides)?;
    let plan = SpikeTestPlan::from_config(&config.spike, config.http.timeout)?;

    let http = HttpConfig::for_load(config.http.clone(), config.spike.peak_concurrency());
    let transport = Arc::new(ReqwestTransport::new(http).context("Failed to create HTTP transport")?);

    let (channel_sink, events) = ChannelSink::new();
    let sink: Arc<dyn EventSink> = Arc::new(
        FanoutSink::new()
            .with(Arc::new(TracingSink::new(config.logging.log_requests)))
            .with(Arc::new(channel_sink)),
    );
    let progress = tokio::spawn(track_progress(events));

    let interrupt = CancellationToken::new();
    let ctrl_c = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping the current phase");
                interrupt.cancel();
            }
        })
    };

    info!(
        target_url = %plan.target(),
        baseline = plan.baseline.concurrency,
        spike = plan.spike.concurrency,
        recovery = plan.recovery.concurrency,
        "Starting spike test"
    );

    let started_at = Utc::now();
    let mut orchestrator =
        SpikeTestOrchestrator::new(plan.clone(), transport, sink).with_interrupt(interrupt.clone());
    let outcome = orchestrator.run().await;
    let finished_at = Utc::now();

    ctrl_c.abort();
    // Closing the channel ends the progress task
    drop(orchestrator);
    match progress.await {
        Ok(requests) => info!(requests, "Spike test finished"),
        Err(e) => warn!("Progress task failed: {}", e),
    }

    let report = SpikeTestReport::from_outcome(Uuid::new_v4(), &plan, started_at, finished_at, &outcome);

    if let Err(e) = write_report(&config, &report).await {
        error!("Failed to write report: {:#}", e);
    }

    if config.output.print_summary {
        print_summary(&report);
    }

    outcome.map(|_| ()).context("Spike test did not complete")
}

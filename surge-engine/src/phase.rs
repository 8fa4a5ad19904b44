//! Phase configuration and the phase runner

use crate::error::PhaseError;
use crate::events::{EventSink, LoadEvent};
use crate::metrics::{ActiveWorkers, MetricsAggregator, PhaseResult};
use crate::scenario::ScenarioMix;
use crate::worker::{VirtualUser, WorkerContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use surge_http::Transport;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Grace period used when none is configured
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// The three phases of a spike test, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Baseline,
    Spike,
    Recovery,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [PhaseKind::Baseline, PhaseKind::Spike, PhaseKind::Recovery];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Baseline => "baseline",
            PhaseKind::Spike => "spike",
            PhaseKind::Recovery => "recovery",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable parameters of one phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseConfig {
    pub kind: PhaseKind,
    /// Number of virtual users
    pub concurrency: usize,
    pub duration: Duration,
    /// Window over which workers are started
    pub ramp_up: Duration,
    pub base_url: Url,
    /// How long in-flight requests may run past the deadline
    pub grace_period: Duration,
}

impl PhaseConfig {
    pub fn new(kind: PhaseKind, concurrency: usize, duration: Duration, base_url: Url) -> Self {
        Self {
            kind,
            concurrency,
            duration,
            ramp_up: Duration::ZERO,
            base_url,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up = ramp_up;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn validate(&self) -> Result<(), PhaseError> {
        if self.concurrency == 0 {
            return Err(PhaseError::InvalidConfig(format!(
                "{} concurrency must be greater than 0",
                self.kind
            )));
        }
        if self.duration.is_zero() {
            return Err(PhaseError::InvalidConfig(format!(
                "{} duration must be greater than 0",
                self.kind
            )));
        }
        if self.ramp_up >= self.duration {
            return Err(PhaseError::InvalidConfig(format!(
                "{} ramp-up ({:?}) must be shorter than the phase duration ({:?})",
                self.kind, self.ramp_up, self.duration
            )));
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(PhaseError::InvalidConfig(format!(
                "base URL must use http or https, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// Scheduled start offset of each worker: worker `i` starts at `i * ramp_up / n`
pub fn ramp_schedule(concurrency: usize, ramp_up: Duration) -> Vec<Duration> {
    let ramp_nanos = ramp_up.as_nanos();
    let n = concurrency.max(1) as u128;
    (0..concurrency)
        .map(|i| Duration::from_nanos((ramp_nanos * i as u128 / n) as u64))
        .collect()
}

/// Runs one phase: spawns workers along the ramp, stops them at the deadline
pub struct PhaseRunner {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    interrupt: CancellationToken,
}

impl PhaseRunner {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            transport,
            sink,
            interrupt: CancellationToken::new(),
        }
    }

    /// Stop any running phase early when `interrupt` is cancelled
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub async fn run_phase(&self, scenarios: &Arc<ScenarioMix>, config: &PhaseConfig) -> Result<PhaseResult, PhaseError> {
        config.validate()?;

        let kind = config.kind;
        let aggregator = Arc::new(MetricsAggregator::new(kind));
        let gauge = Arc::new(ActiveWorkers::new());
        let stop = self.interrupt.child_token();
        let context = Arc::new(WorkerContext {
            phase: kind,
            base_url: config.base_url.clone(),
            mix: Arc::clone(scenarios),
            transport: Arc::clone(&self.transport),
            aggregator: Arc::clone(&aggregator),
            gauge: Arc::clone(&gauge),
            sink: Arc::clone(&self.sink),
        });

        info!(
            phase = %kind,
            concurrency = config.concurrency,
            duration_secs = config.duration.as_secs_f64(),
            "Starting {} phase",
            kind
        );

        let start = Instant::now();
        let deadline = start + config.duration;
        self.sink.emit(LoadEvent::TestStart {
            phase: kind,
            concurrency: config.concurrency,
            duration: config.duration,
            ramp_up: config.ramp_up,
            scenarios: scenarios.names(),
        });

        let mut workers = JoinSet::new();
        let mut interrupted = false;

        for (id, offset) in ramp_schedule(config.concurrency, config.ramp_up).into_iter().enumerate() {
            if offset >= config.duration {
                break;
            }

            tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => {
                    interrupted = true;
                    break;
                }
                _ = tokio::time::sleep_until(start + offset) => {}
            }

            self.sink.emit(LoadEvent::WorkerStarted {
                phase: kind,
                worker: id,
                offset: start.elapsed(),
            });
            workers.spawn(VirtualUser::new(id, Arc::clone(&context), stop.clone()).run());
        }

        if !interrupted {
            tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => interrupted = true,
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }

        stop.cancel();
        let elapsed = start.elapsed();

        let drained = tokio::time::timeout(config.grace_period, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(phase = %kind, "Virtual user panicked: {}", e);
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                phase = %kind,
                abandoned = workers.len(),
                grace_ms = config.grace_period.as_millis() as u64,
                "Abandoning virtual users still in flight after the grace period"
            );
            workers.shutdown().await;
        }

        // An interrupted phase reports over the time it actually ran
        let window = if interrupted { elapsed } else { config.duration };
        let result = aggregator.finalize(window).with_runtime(elapsed, gauge.peak());

        self.sink.emit(LoadEvent::TestComplete {
            result: Box::new(result.clone()),
        });

        if interrupted {
            warn!(phase = %kind, elapsed_ms = result.elapsed_ms, "Phase interrupted");
            return Err(PhaseError::Interrupted(Box::new(result)));
        }

        Ok(result)
    }
}

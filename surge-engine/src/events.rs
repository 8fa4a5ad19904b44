//! Load events and the sinks that observe them
//!
//! The engine emits events without knowing who consumes them. Sinks must not
//! block: anything slow belongs behind a [`ChannelSink`] on a separate task.

use crate::metrics::PhaseResult;
use crate::phase::PhaseKind;
use crate::record::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Something observable that happened during a phase
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    TestStart {
        phase: PhaseKind,
        concurrency: usize,
        duration: Duration,
        ramp_up: Duration,
        scenarios: Vec<String>,
    },
    WorkerStarted {
        phase: PhaseKind,
        worker: usize,
        /// Time since phase start at which the worker was spawned
        offset: Duration,
    },
    RequestComplete {
        phase: PhaseKind,
        worker: usize,
        scenario: String,
        status: u16,
        response_time_ms: f64,
    },
    RequestError {
        phase: PhaseKind,
        worker: usize,
        scenario: String,
        error: ErrorKind,
        status: Option<u16>,
        response_time_ms: f64,
    },
    TestComplete {
        result: Box<PhaseResult>,
    },
}

impl LoadEvent {
    pub fn phase(&self) -> PhaseKind {
        match self {
            LoadEvent::TestStart { phase, .. }
            | LoadEvent::WorkerStarted { phase, .. }
            | LoadEvent::RequestComplete { phase, .. }
            | LoadEvent::RequestError { phase, .. } => *phase,
            LoadEvent::TestComplete { result } => result.phase,
        }
    }
}

/// Observer of load events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LoadEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: LoadEvent) {}
}

/// Turns events into structured log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink {
    log_requests: bool,
}

impl TracingSink {
    pub fn new(log_requests: bool) -> Self {
        Self { log_requests }
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: LoadEvent) {
        match event {
            LoadEvent::TestStart {
                phase,
                concurrency,
                duration,
                ramp_up,
                scenarios,
            } => info!(
                %phase,
                concurrency,
                duration_secs = duration.as_secs_f64(),
                ramp_up_secs = ramp_up.as_secs_f64(),
                scenarios = %scenarios.join(","),
                "Phase started"
            ),
            LoadEvent::WorkerStarted { phase, worker, offset } => debug!(
                %phase,
                worker,
                offset_ms = offset.as_millis() as u64,
                "Virtual user started"
            ),
            LoadEvent::RequestComplete {
                phase,
                worker,
                scenario,
                status,
                response_time_ms,
            } if self.log_requests => debug!(%phase, worker, %scenario, status, response_time_ms, "Request complete"),
            LoadEvent::RequestError {
                phase,
                worker,
                scenario,
                error,
                status,
                response_time_ms,
            } if self.log_requests => debug!(
                %phase,
                worker,
                %scenario,
                %error,
                status = status.unwrap_or_default(),
                response_time_ms,
                "Request failed"
            ),
            LoadEvent::TestComplete { result } => {
                if result.empty {
                    warn!(phase = %result.phase, "Phase completed without a single request");
                }
                info!(
                    phase = %result.phase,
                    total = result.total_requests,
                    failed = result.failed_requests,
                    throughput = result.throughput_req_per_sec,
                    p95_ms = result.latency.p95,
                    error_rate = result.error_rate,
                    "Phase completed"
                );
            }
            _ => {}
        }
    }
}

/// Forwards events to a separate task over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<LoadEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LoadEvent) {
        // A closed receiver only means nobody is listening any more
        let _ = self.sender.send(event);
    }
}

/// Delivers every event to several sinks in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: LoadEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

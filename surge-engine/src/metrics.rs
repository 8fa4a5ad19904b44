//! Metrics aggregation for a single phase

use crate::phase::PhaseKind;
use crate::record::RequestRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Latency distribution in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-scenario slice of a phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioBreakdown {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub error_rate: f64,
    pub mean_ms: f64,
}

/// Immutable summary of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResult {
    pub phase: PhaseKind,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub throughput_req_per_sec: f64,
    pub latency: LatencyStats,
    /// 0 for an empty phase; check `empty` before trusting it
    pub error_rate: f64,
    /// No request completed during the phase
    pub empty: bool,
    /// Window the throughput was computed over
    pub duration_secs: f64,
    pub elapsed_ms: u64,
    pub peak_concurrency: usize,
    pub bytes_received: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub error_kinds: BTreeMap<String, u64>,
    pub scenarios: BTreeMap<String, ScenarioBreakdown>,
}

impl PhaseResult {
    /// Error rate, or `None` when nothing was observed
    pub fn observed_error_rate(&self) -> Option<f64> {
        if self.empty {
            None
        } else {
            Some(self.error_rate)
        }
    }

    /// Attach what the phase runner observed while the phase ran
    pub fn with_runtime(mut self, elapsed: Duration, peak_concurrency: usize) -> Self {
        self.elapsed_ms = elapsed.as_millis() as u64;
        self.peak_concurrency = peak_concurrency;
        self
    }
}

/// Nearest-rank percentile over an ascending slice.
///
/// `p` is a fraction in `(0, 1]`. The slice must not be empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    // Guard against p * n landing a hair above an integer
    let rank = ((p * n as f64) - 1e-9).ceil().max(1.0) as usize;
    sorted[rank.min(n) - 1]
}

#[derive(Debug, Default)]
struct AggregatorState {
    records: Vec<RequestRecord>,
    finalized: Option<PhaseResult>,
    dropped: u64,
}

/// Collects request records from all workers of a phase
#[derive(Debug)]
pub struct MetricsAggregator {
    phase: PhaseKind,
    state: Mutex<AggregatorState>,
}

impl MetricsAggregator {
    pub fn new(phase: PhaseKind) -> Self {
        Self {
            phase,
            state: Mutex::new(AggregatorState::default()),
        }
    }

    /// Append a record. Records arriving after finalization are dropped.
    pub fn record(&self, record: RequestRecord) {
        let mut state = self.state.lock();
        if state.finalized.is_some() {
            state.dropped += 1;
            warn!(
                phase = %self.phase,
                scenario = %record.scenario,
                "Dropping request record received after phase was finalized"
            );
            return;
        }
        state.records.push(record);
    }

    /// Number of records collected so far
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records dropped because they arrived late
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    /// Compute the phase summary over `duration`.
    ///
    /// The first call computes and caches the result; later calls return
    /// the cached value regardless of their argument.
    pub fn finalize(&self, duration: Duration) -> PhaseResult {
        let mut state = self.state.lock();
        if let Some(result) = &state.finalized {
            return result.clone();
        }

        let result = summarize(self.phase, &state.records, duration);
        debug!(
            phase = %self.phase,
            total = result.total_requests,
            failed = result.failed_requests,
            "Phase metrics finalized"
        );
        state.finalized = Some(result.clone());
        result
    }
}

fn summarize(phase: PhaseKind, records: &[RequestRecord], duration: Duration) -> PhaseResult {
    let total = records.len() as u64;
    let successful = records.iter().filter(|r| r.is_success()).count() as u64;
    let failed = total - successful;
    let duration_secs = duration.as_secs_f64();

    let mut status_codes = BTreeMap::new();
    let mut error_kinds = BTreeMap::new();
    let mut scenarios: BTreeMap<String, ScenarioBreakdown> = BTreeMap::new();
    let mut scenario_latency: BTreeMap<&str, f64> = BTreeMap::new();
    let mut bytes_received = 0u64;

    for record in records {
        bytes_received += record.bytes_received;
        if let Some(status) = record.status_code {
            *status_codes.entry(status).or_insert(0) += 1;
        }
        if let Some(kind) = record.error_kind {
            *error_kinds.entry(kind.to_string()).or_insert(0) += 1;
        }

        let stats = scenarios.entry(record.scenario.clone()).or_default();
        stats.total_requests += 1;
        if record.is_success() {
            stats.successful_requests += 1;
        } else {
            stats.failed_requests += 1;
        }
        *scenario_latency.entry(record.scenario.as_str()).or_insert(0.0) += record.response_time_ms;
    }

    for (name, stats) in scenarios.iter_mut() {
        let count = stats.total_requests as f64;
        stats.error_rate = stats.failed_requests as f64 / count;
        stats.mean_ms = scenario_latency.get(name.as_str()).copied().unwrap_or(0.0) / count;
    }

    let latency = if records.is_empty() {
        LatencyStats::default()
    } else {
        let mut times: Vec<f64> = records.iter().map(|r| r.response_time_ms).collect();
        times.sort_by(f64::total_cmp);
        LatencyStats {
            p50: percentile(&times, 0.50),
            p95: percentile(&times, 0.95),
            p99: percentile(&times, 0.99),
            mean: times.iter().sum::<f64>() / times.len() as f64,
            min: times[0],
            max: times[times.len() - 1],
        }
    };

    PhaseResult {
        phase,
        total_requests: total,
        successful_requests: successful,
        failed_requests: failed,
        throughput_req_per_sec: if duration_secs > 0.0 {
            total as f64 / duration_secs
        } else {
            0.0
        },
        latency,
        error_rate: if total > 0 {
            failed as f64 / total as f64
        } else {
            0.0
        },
        empty: total == 0,
        duration_secs,
        elapsed_ms: 0,
        peak_concurrency: 0,
        bytes_received,
        status_codes,
        error_kinds,
        scenarios,
    }
}

/// Gauge of running workers that remembers its high-water mark
#[derive(Debug, Default)]
pub struct ActiveWorkers {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running worker until the guard is dropped
    pub fn enter(self: &Arc<Self>) -> ActiveWorkerGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveWorkerGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the gauge on drop, including when the task is aborted
#[derive(Debug)]
pub struct ActiveWorkerGuard {
    gauge: Arc<ActiveWorkers>,
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        self.gauge.active.fetch_sub(1, Ordering::SeqCst);
    }
}

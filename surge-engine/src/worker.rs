//! Virtual-user worker loop

use crate::events::{EventSink, LoadEvent};
use crate::metrics::{ActiveWorkers, MetricsAggregator};
use crate::phase::PhaseKind;
use crate::record::{ErrorKind, RequestRecord};
use crate::scenario::{RequestContext, ScenarioMix, ScenarioTemplate};
use chrono::Utc;
use std::sync::Arc;
use surge_http::{Transport, TransportError, TransportResponse};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// Everything the workers of one phase share
pub struct WorkerContext {
    pub phase: PhaseKind,
    pub base_url: Url,
    pub mix: Arc<ScenarioMix>,
    pub transport: Arc<dyn Transport>,
    pub aggregator: Arc<MetricsAggregator>,
    pub gauge: Arc<ActiveWorkers>,
    pub sink: Arc<dyn EventSink>,
}

/// One simulated client issuing scenario requests back to back
pub struct VirtualUser {
    id: usize,
    context: Arc<WorkerContext>,
    stop: CancellationToken,
}

impl VirtualUser {
    pub fn new(id: usize, context: Arc<WorkerContext>, stop: CancellationToken) -> Self {
        Self { id, context, stop }
    }

    /// Issue requests until the stop token is cancelled.
    ///
    /// Returns the number of requests recorded. Request failures are recorded
    /// and never end the loop.
    pub async fn run(self) -> u64 {
        let _active = self.context.gauge.enter();
        let mut rng = fastrand::Rng::new();
        let mut iteration = 0u64;

        trace!(phase = %self.context.phase, worker = self.id, "Virtual user loop starting");

        while !self.stop.is_cancelled() {
            let scenario = Arc::clone(self.context.mix.pick(&mut rng));
            let record = self.execute(&scenario, iteration).await;

            self.context.sink.emit(self.event_for(&record));
            self.context.aggregator.record(record);
            iteration += 1;

            tokio::task::yield_now().await;
        }

        debug!(phase = %self.context.phase, worker = self.id, requests = iteration, "Virtual user stopped");
        iteration
    }

    async fn execute(&self, scenario: &ScenarioTemplate, iteration: u64) -> RequestRecord {
        let request_context = RequestContext {
            worker: self.id,
            iteration,
            phase: self.context.phase,
        };
        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = match scenario.render(&self.context.base_url, &request_context) {
            Ok(request) => self.context.transport.send(request).await,
            Err(e) => Err(TransportError::InvalidRequest(e.to_string())),
        };

        let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        classify(scenario, started_at, response_time_ms, outcome)
    }

    fn event_for(&self, record: &RequestRecord) -> LoadEvent {
        match (record.error_kind, record.status_code) {
            (None, Some(status)) => LoadEvent::RequestComplete {
                phase: self.context.phase,
                worker: self.id,
                scenario: record.scenario.clone(),
                status,
                response_time_ms: record.response_time_ms,
            },
            (error, status) => LoadEvent::RequestError {
                phase: self.context.phase,
                worker: self.id,
                scenario: record.scenario.clone(),
                error: error.unwrap_or(ErrorKind::Network),
                status,
                response_time_ms: record.response_time_ms,
            },
        }
    }
}

/// Turn a transport outcome into a request record
pub fn classify(
    scenario: &ScenarioTemplate,
    started_at: chrono::DateTime<Utc>,
    response_time_ms: f64,
    outcome: Result<TransportResponse, TransportError>,
) -> RequestRecord {
    match outcome {
        Ok(response) => {
            let status = response.status;
            let error = match scenario.expected_status {
                Some(expected) if status != expected => Some(ErrorKind::UnexpectedStatus(status)),
                Some(_) => None,
                None if status >= 400 => Some(ErrorKind::Http(status)),
                None => None,
            };

            match error {
                None => RequestRecord::success(
                    &scenario.name,
                    started_at,
                    response_time_ms,
                    status,
                    response.bytes_received,
                ),
                Some(kind) => RequestRecord::failure(
                    &scenario.name,
                    started_at,
                    response_time_ms,
                    Some(status),
                    kind,
                    response.bytes_received,
                ),
            }
        }
        Err(err) => {
            let kind = match err {
                TransportError::Timeout(_) => ErrorKind::Timeout,
                TransportError::Network(_) => ErrorKind::Network,
                TransportError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            };
            RequestRecord::failure(&scenario.name, started_at, response_time_ms, None, kind, 0)
        }
    }
}

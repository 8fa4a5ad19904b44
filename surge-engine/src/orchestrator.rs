//! Sequences baseline, spike and recovery phases and analyses the outcome

use crate::analysis::{analyze, SpikeAnalysis};
use crate::error::{PartialPhases, PhaseError, SpikeTestError};
use crate::events::EventSink;
use crate::metrics::PhaseResult;
use crate::phase::{PhaseConfig, PhaseKind, PhaseRunner};
use crate::scenario::{ScenarioMix, ScenarioTemplate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use surge_config::validation::Validatable;
use surge_config::SpikeConfig;
use surge_http::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

/// Everything needed to run a spike test, built once before the run
#[derive(Debug, Clone)]
pub struct SpikeTestPlan {
    pub scenarios: Vec<ScenarioTemplate>,
    pub baseline: PhaseConfig,
    pub spike: PhaseConfig,
    pub recovery: PhaseConfig,
}

impl SpikeTestPlan {
    /// Build a plan from configuration.
    ///
    /// `request_timeout` is the grace period for phases that do not set one.
    pub fn from_config(config: &SpikeConfig, request_timeout: Duration) -> Result<Self, SpikeTestError> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SpikeTestError::Configuration(format!("Invalid base_url '{}': {}", config.base_url, e)))?;
        let grace_period = config.grace_period.unwrap_or(request_timeout);

        let phase = |kind, concurrency, ramp_up| {
            PhaseConfig::new(kind, concurrency, config.duration, base_url.clone())
                .with_ramp_up(ramp_up)
                .with_grace_period(grace_period)
        };

        let scenarios = config
            .scenarios
            .iter()
            .map(ScenarioTemplate::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let plan = Self {
            scenarios,
            baseline: phase(PhaseKind::Baseline, config.baseline_concurrency, config.baseline_ramp_up),
            spike: phase(PhaseKind::Spike, config.spike_concurrency, config.spike_ramp_up),
            recovery: phase(PhaseKind::Recovery, config.recovery_concurrency, config.recovery_ramp_up),
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn phase(&self, kind: PhaseKind) -> &PhaseConfig {
        match kind {
            PhaseKind::Baseline => &self.baseline,
            PhaseKind::Spike => &self.spike,
            PhaseKind::Recovery => &self.recovery,
        }
    }

    pub fn validate(&self) -> Result<(), SpikeTestError> {
        for kind in PhaseKind::ALL {
            let config = self.phase(kind);
            if config.kind != kind {
                return Err(SpikeTestError::Configuration(format!(
                    "{} phase is configured as {}",
                    kind, config.kind
                )));
            }
            config.validate().map_err(|e| SpikeTestError::Configuration(e.to_string()))?;
        }
        ScenarioMix::new(self.scenarios.clone())?;
        Ok(())
    }

    /// Target base URL, taken from the baseline phase
    pub fn target(&self) -> &Url {
        &self.baseline.base_url
    }
}

/// Results of a completed spike test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeTestResult {
    pub baseline: PhaseResult,
    pub spike: PhaseResult,
    pub recovery: PhaseResult,
    pub analysis: SpikeAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Init,
    Baseline,
    Spike,
    Recovery,
    Done,
    Failed,
}

impl From<PhaseKind> for OrchestratorState {
    fn from(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Baseline => OrchestratorState::Baseline,
            PhaseKind::Spike => OrchestratorState::Spike,
            PhaseKind::Recovery => OrchestratorState::Recovery,
        }
    }
}

/// Runs a spike test plan exactly once
pub struct SpikeTestOrchestrator {
    plan: SpikeTestPlan,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    interrupt: CancellationToken,
    state: OrchestratorState,
    result: Option<SpikeTestResult>,
}

impl SpikeTestOrchestrator {
    pub fn new(plan: SpikeTestPlan, transport: Arc<dyn Transport>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            plan,
            transport,
            sink,
            interrupt: CancellationToken::new(),
            state: OrchestratorState::Init,
            result: None,
        }
    }

    /// Cancelling `interrupt` stops the current phase and ends the run
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn plan(&self) -> &SpikeTestPlan {
        &self.plan
    }

    /// Result of a successful run
    pub fn result(&self) -> Option<&SpikeTestResult> {
        self.result.as_ref()
    }

    pub async fn run(&mut self) -> Result<SpikeTestResult, SpikeTestError> {
        if self.state != OrchestratorState::Init {
            return Err(SpikeTestError::AlreadyRun);
        }

        let outcome = self.execute().await;
        match &outcome {
            Ok(result) => {
                self.result = Some(result.clone());
                self.state = OrchestratorState::Done;
                info!(target_url = %self.plan.target(), "Spike test completed");
            }
            Err(e) => {
                self.state = OrchestratorState::Failed;
                error!("Spike test failed: {}", e);
            }
        }
        outcome
    }

    async fn execute(&mut self) -> Result<SpikeTestResult, SpikeTestError> {
        self.plan.validate()?;
        let mix = Arc::new(ScenarioMix::new(self.plan.scenarios.clone())?);

        let runner = PhaseRunner::new(Arc::clone(&self.transport), Arc::clone(&self.sink))
            .with_interrupt(self.interrupt.clone());
        let mut phases = PartialPhases::default();

        for kind in PhaseKind::ALL {
            self.state = kind.into();
            match runner.run_phase(&mix, self.plan.phase(kind)).await {
                Ok(result) => phases.set(result),
                Err(PhaseError::Interrupted(partial)) => {
                    phases.set(*partial);
                    return Err(SpikeTestError::Interrupted {
                        phase: kind,
                        phases: Box::new(phases),
                    });
                }
                Err(source) => {
                    return Err(SpikeTestError::Phase {
                        phase: kind,
                        source,
                        phases: Box::new(phases),
                    });
                }
            }
        }

        let (Some(baseline), Some(spike), Some(recovery)) = (phases.baseline.take(), phases.spike.take(), phases.recovery.take())
        else {
            return Err(SpikeTestError::Configuration("phase results missing after run".to_string()));
        };

        let analysis = match analyze(&baseline, &spike, &recovery) {
            Ok(analysis) => analysis,
            Err(source) => {
                return Err(SpikeTestError::Analysis {
                    source,
                    phases: Box::new(PartialPhases {
                        baseline: Some(baseline),
                        spike: Some(spike),
                        recovery: Some(recovery),
                    }),
                })
            }
        };

        Ok(SpikeTestResult {
            baseline,
            spike,
            recovery,
            analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::events::{ChannelSink, LoadEvent, NoopSink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use surge_config::ScenarioConfig;
    use surge_http::{HttpMethod, PreparedRequest, TransportError, TransportResponse};

    /// Latency grows with the number of requests in flight
    struct LoadSensitive {
        in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Transport for LoadSensitive {
        async fn send(&self, _request: PreparedRequest) -> Result<TransportResponse, TransportError> {
            let load = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let latency = if load > 20 { 200 } else { 20 };
            tokio::time::sleep(Duration::from_millis(latency)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(TransportResponse {
                status: if load > 40 { 503 } else { 200 },
                bytes_received: 16,
            })
        }
    }

    /// Never answers
    struct BlackHole;

    #[async_trait]
    impl Transport for BlackHole {
        async fn send(&self, _request: PreparedRequest) -> Result<TransportResponse, TransportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(TransportError::Timeout("no answer".into()))
        }
    }

    fn plan(baseline: usize, spike: usize, recovery: usize) -> SpikeTestPlan {
        let url = Url::parse("http://localhost:3000").unwrap();
        let duration = Duration::from_secs(5);
        SpikeTestPlan {
            scenarios: vec![ScenarioTemplate::new("health", HttpMethod::Get, "/health")],
            baseline: PhaseConfig::new(PhaseKind::Baseline, baseline, duration, url.clone())
                .with_ramp_up(Duration::from_secs(1))
                .with_grace_period(Duration::from_millis(500)),
            spike: PhaseConfig::new(PhaseKind::Spike, spike, duration, url.clone())
                .with_grace_period(Duration::from_millis(500)),
            recovery: PhaseConfig::new(PhaseKind::Recovery, recovery, duration, url)
                .with_grace_period(Duration::from_millis(500)),
        }
    }

    fn load_sensitive() -> Arc<dyn Transport> {
        Arc::new(LoadSensitive {
            in_flight: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_reports_spike_impact() {
        let (sink, mut rx) = ChannelSink::new();
        let mut orchestrator = SpikeTestOrchestrator::new(plan(10, 60, 10), load_sensitive(), Arc::new(sink));

        let result = orchestrator.run().await.unwrap();

        assert_eq!(orchestrator.state(), OrchestratorState::Done);
        assert!(orchestrator.result().is_some());
        assert_eq!(result.baseline.error_rate, 0.0);
        assert!(result.spike.error_rate > 0.0);
        assert!(result.spike.latency.p95 > result.baseline.latency.p95);
        assert!(result.analysis.spike_impact.latency_change_pct > 0.0);
        assert!((result.analysis.recovery_analysis.latency_recovery_pct - 100.0).abs() < 1.0);

        let mut phase_order = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let LoadEvent::TestStart { phase, .. } = event {
                phase_order.push(phase);
            }
        }
        assert_eq!(phase_order, PhaseKind::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_is_rejected() {
        let mut orchestrator = SpikeTestOrchestrator::new(plan(2, 4, 2), load_sensitive(), Arc::new(NoopSink));

        assert!(orchestrator.run().await.is_ok());
        assert!(matches!(orchestrator.run().await, Err(SpikeTestError::AlreadyRun)));
        assert_eq!(orchestrator.state(), OrchestratorState::Done);
    }

    #[tokio::test]
    async fn test_invalid_plan_aborts_before_any_phase() {
        let (sink, mut rx) = ChannelSink::new();
        let mut orchestrator = SpikeTestOrchestrator::new(plan(10, 0, 10), load_sensitive(), Arc::new(sink));

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SpikeTestError::Configuration(_)));
        assert!(err.partial_phases().is_none());
        assert_eq!(orchestrator.state(), OrchestratorState::Failed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_target_fails_analysis_but_keeps_phases() {
        let mut orchestrator = SpikeTestOrchestrator::new(plan(2, 4, 2), Arc::new(BlackHole), Arc::new(NoopSink));

        let err = orchestrator.run().await.unwrap_err();

        match &err {
            SpikeTestError::Analysis { source, phases } => {
                assert_eq!(*source, AnalysisError::DegenerateBaseline { metric: "throughput" });
                assert_eq!(phases.completed(), 3);
                assert!(phases.baseline.as_ref().unwrap().empty);
            }
            other => panic!("expected analysis failure, got {other:?}"),
        }
        assert_eq!(orchestrator.state(), OrchestratorState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_spike_keeps_baseline() {
        let interrupt = CancellationToken::new();
        let mut orchestrator =
            SpikeTestOrchestrator::new(plan(5, 20, 5), load_sensitive(), Arc::new(NoopSink)).with_interrupt(interrupt.clone());

        tokio::spawn(async move {
            // baseline runs 5s; interrupt halfway through the spike
            tokio::time::sleep(Duration::from_millis(7500)).await;
            interrupt.cancel();
        });

        let err = orchestrator.run().await.unwrap_err();

        match err {
            SpikeTestError::Interrupted { phase, phases } => {
                assert_eq!(phase, PhaseKind::Spike);
                assert!(phases.baseline.is_some());
                let spike = phases.spike.as_ref().unwrap();
                assert!(spike.duration_secs < 5.0);
                assert!(phases.recovery.is_none());
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert_eq!(orchestrator.state(), OrchestratorState::Failed);
    }

    #[test]
    fn test_plan_from_config() {
        let mut config = SpikeConfig::default();
        config.base_url = "http://api.internal:8080".to_string();
        config.spike_ramp_up = Duration::from_secs(1);
        config.scenarios = vec![
            ScenarioConfig::new("list", "GET", "/api/portfolios"),
            ScenarioConfig::new("create", "POST", "/api/trades"),
        ];

        let plan = SpikeTestPlan::from_config(&config, Duration::from_secs(7)).unwrap();

        assert_eq!(plan.scenarios.len(), 2);
        assert_eq!(plan.baseline.concurrency, config.baseline_concurrency);
        assert_eq!(plan.spike.concurrency, config.spike_concurrency);
        assert_eq!(plan.spike.ramp_up, Duration::from_secs(1));
        assert_eq!(plan.recovery.grace_period, Duration::from_secs(7));
        assert_eq!(plan.target().as_str(), "http://api.internal:8080/");

        config.grace_period = Some(Duration::from_secs(2));
        let plan = SpikeTestPlan::from_config(&config, Duration::from_secs(7)).unwrap();
        assert_eq!(plan.baseline.grace_period, Duration::from_secs(2));

        config.spike_concurrency = 0;
        assert!(matches!(
            SpikeTestPlan::from_config(&config, Duration::from_secs(7)),
            Err(SpikeTestError::Configuration(_))
        ));
    }
}

//! Serializable report of a spike test run, complete or not

use crate::analysis::SpikeAnalysis;
use crate::error::SpikeTestError;
use crate::metrics::PhaseResult;
use crate::orchestrator::{SpikeTestPlan, SpikeTestResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Completed,
    /// All phases ran but could not be compared
    AnalysisFailed,
    Interrupted,
    Failed,
}

/// Shape of the load that was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub baseline_concurrency: usize,
    pub spike_concurrency: usize,
    pub recovery_concurrency: usize,
    pub duration_secs: f64,
    pub baseline_ramp_up_secs: f64,
    pub spike_ramp_up_secs: f64,
    pub recovery_ramp_up_secs: f64,
    pub scenarios: Vec<String>,
}

impl From<&SpikeTestPlan> for PlanSummary {
    fn from(plan: &SpikeTestPlan) -> Self {
        Self {
            baseline_concurrency: plan.baseline.concurrency,
            spike_concurrency: plan.spike.concurrency,
            recovery_concurrency: plan.recovery.concurrency,
            duration_secs: plan.baseline.duration.as_secs_f64(),
            baseline_ramp_up_secs: plan.baseline.ramp_up.as_secs_f64(),
            spike_ramp_up_secs: plan.spike.ramp_up.as_secs_f64(),
            recovery_ramp_up_secs: plan.recovery.ramp_up.as_secs_f64(),
            scenarios: plan.scenarios.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// The report artifact written after every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeTestReport {
    pub run_id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub plan: PlanSummary,
    pub status: ReportStatus,
    pub baseline: Option<PhaseResult>,
    pub spike: Option<PhaseResult>,
    pub recovery: Option<PhaseResult>,
    pub analysis: Option<SpikeAnalysis>,
    pub error: Option<String>,
}

impl SpikeTestReport {
    /// Build a report from the outcome of `SpikeTestOrchestrator::run`
    pub fn from_outcome(
        run_id: Uuid,
        plan: &SpikeTestPlan,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcome: &Result<SpikeTestResult, SpikeTestError>,
    ) -> Self {
        let mut report = Self {
            run_id,
            target: plan.target().to_string(),
            started_at,
            finished_at,
            plan: PlanSummary::from(plan),
            status: ReportStatus::Completed,
            baseline: None,
            spike: None,
            recovery: None,
            analysis: None,
            error: None,
        };

        match outcome {
            Ok(result) => {
                report.baseline = Some(result.baseline.clone());
                report.spike = Some(result.spike.clone());
                report.recovery = Some(result.recovery.clone());
                report.analysis = Some(result.analysis);
            }
            Err(err) => {
                report.status = match err {
                    SpikeTestError::Analysis { .. } => ReportStatus::AnalysisFailed,
                    SpikeTestError::Interrupted { .. } => ReportStatus::Interrupted,
                    _ => ReportStatus::Failed,
                };
                report.error = Some(err.to_string());
                if let Some(phases) = err.partial_phases() {
                    report.baseline = phases.baseline.clone();
                    report.spike = phases.spike.clone();
                    report.recovery = phases.recovery.clone();
                }
            }
        }

        report
    }

    pub fn is_complete(&self) -> bool {
        self.status == ReportStatus::Completed
    }

    /// Completed phases in execution order
    pub fn phases(&self) -> impl Iterator<Item = &PhaseResult> {
        [&self.baseline, &self.spike, &self.recovery]
            .into_iter()
            .filter_map(|p| p.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, PartialPhases};
    use crate::metrics::MetricsAggregator;
    use crate::phase::{PhaseConfig, PhaseKind};
    use crate::scenario::ScenarioTemplate;
    use std::time::Duration;
    use surge_http::HttpMethod;
    use url::Url;

    fn plan() -> SpikeTestPlan {
        let url = Url::parse("http://localhost:3000").unwrap();
        let duration = Duration::from_secs(30);
        SpikeTestPlan {
            scenarios: vec![ScenarioTemplate::new("health", HttpMethod::Get, "/health")],
            baseline: PhaseConfig::new(PhaseKind::Baseline, 10, duration, url.clone()).with_ramp_up(Duration::from_secs(10)),
            spike: PhaseConfig::new(PhaseKind::Spike, 100, duration, url.clone()).with_ramp_up(Duration::from_secs(1)),
            recovery: PhaseConfig::new(PhaseKind::Recovery, 10, duration, url),
        }
    }

    fn empty(kind: PhaseKind) -> PhaseResult {
        MetricsAggregator::new(kind).finalize(Duration::from_secs(30))
    }

    #[test]
    fn test_report_for_interrupted_run() {
        let mut phases = PartialPhases::default();
        phases.set(empty(PhaseKind::Baseline));
        let outcome = Err(SpikeTestError::Interrupted {
            phase: PhaseKind::Spike,
            phases: Box::new(phases),
        });

        let now = Utc::now();
        let report = SpikeTestReport::from_outcome(Uuid::new_v4(), &plan(), now, now, &outcome);

        assert_eq!(report.status, ReportStatus::Interrupted);
        assert!(!report.is_complete());
        assert!(report.baseline.is_some());
        assert!(report.spike.is_none());
        assert_eq!(report.phases().count(), 1);
        assert!(report.error.as_deref().unwrap().contains("spike"));
        assert_eq!(report.plan.spike_concurrency, 100);
        assert_eq!(report.plan.baseline_ramp_up_secs, 10.0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let outcome = Err(SpikeTestError::Analysis {
            source: AnalysisError::DegenerateBaseline { metric: "throughput" },
            phases: Box::new(PartialPhases {
                baseline: Some(empty(PhaseKind::Baseline)),
                spike: Some(empty(PhaseKind::Spike)),
                recovery: Some(empty(PhaseKind::Recovery)),
            }),
        });
        let now = Utc::now();
        let report = SpikeTestReport::from_outcome(Uuid::new_v4(), &plan(), now, now, &outcome);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "analysis_failed");
        assert_eq!(json["target"], "http://localhost:3000/");
        assert_eq!(json["plan"]["spikeConcurrency"], 100);
        assert_eq!(json["baseline"]["totalRequests"], 0);
        assert_eq!(json["baseline"]["empty"], true);
        assert!(json["analysis"].is_null());

        let back: SpikeTestReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}

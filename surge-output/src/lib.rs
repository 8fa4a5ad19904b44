//! # Surge report output
//!
//! Writers that persist a [`SpikeTestReport`](surge_engine::SpikeTestReport)
//! after a run, complete or partial.
//!
//! - **Filesystem**: path rendered from a Handlebars template
//!   (`{{run_id}}`, `{{timestamp}}`, `{{status}}`), optional directory
//!   creation, overwrite protection
//! - **Stdio**: the serialized report on stdout or stderr
//!
//! Both support `json`, `json_compact` and `yaml`. A write failure is a
//! [`ReportWriteError`] and never invalidates the results themselves.

pub mod destinations;
pub mod errors;
pub mod format;
pub mod template;
pub mod writer;

pub use destinations::{FilesystemConfig, FilesystemReportWriter, StdStream, StdioReportWriter};
pub use errors::ReportWriteError;
pub use format::ReportFormat;
pub use template::TemplateEngine;
pub use writer::{ReportWriter, WriteOutcome};

#[cfg(test)]
mod tests_support {
    use chrono::Utc;
    use std::time::Duration;
    use surge_engine::{
        analyze, MetricsAggregator, PhaseConfig, PhaseKind, RequestRecord, ScenarioTemplate, SpikeTestPlan,
        SpikeTestReport, SpikeTestResult,
    };
    use surge_http::HttpMethod;
    use url::Url;

    fn phase(kind: PhaseKind, latency_ms: f64, requests: usize) -> surge_engine::PhaseResult {
        let aggregator = MetricsAggregator::new(kind);
        for _ in 0..requests {
            aggregator.record(RequestRecord::success("health", Utc::now(), latency_ms, 200, 64));
        }
        aggregator.finalize(Duration::from_secs(10))
    }

    pub fn sample_report() -> SpikeTestReport {
        let url = Url::parse("http://localhost:3000").unwrap();
        let duration = Duration::from_secs(10);
        let plan = SpikeTestPlan {
            scenarios: vec![ScenarioTemplate::new("health", HttpMethod::Get, "/health")],
            baseline: PhaseConfig::new(PhaseKind::Baseline, 5, duration, url.clone()),
            spike: PhaseConfig::new(PhaseKind::Spike, 50, duration, url.clone()),
            recovery: PhaseConfig::new(PhaseKind::Recovery, 5, duration, url),
        };

        let baseline = phase(PhaseKind::Baseline, 20.0, 100);
        let spike = phase(PhaseKind::Spike, 180.0, 60);
        let recovery = phase(PhaseKind::Recovery, 25.0, 95);
        let analysis = analyze(&baseline, &spike, &recovery).unwrap();
        let outcome = Ok(SpikeTestResult {
            baseline,
            spike,
            recovery,
            analysis,
        });

        let now = Utc::now();
        SpikeTestReport::from_outcome(uuid::Uuid::new_v4(), &plan, now, now, &outcome)
    }
}

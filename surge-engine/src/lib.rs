//! Spike-test load engine
//!
//! A spike test drives a target HTTP service through three sequential
//! phases: a baseline at normal concurrency, an abrupt spike, and a
//! recovery back at normal concurrency. Each phase runs a pool of virtual
//! users ([`VirtualUser`]) that issue scenario requests in a loop through a
//! pluggable [`surge_http::Transport`]. Every request becomes a
//! [`RequestRecord`]; the [`MetricsAggregator`] turns a phase's records into
//! a [`PhaseResult`], and [`analyze`] compares the three results.
//!
//! ```text
//! SpikeTestOrchestrator -> PhaseRunner -> VirtualUser* -> MetricsAggregator
//!        |                                                      |
//!        +------------------- analyze <------ PhaseResult <-----+
//! ```
//!
//! Progress is published as [`LoadEvent`]s to an [`EventSink`]; the engine
//! never depends on who listens.

pub mod analysis;
pub mod error;
pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod phase;
pub mod record;
pub mod report;
pub mod scenario;
pub mod worker;

pub use analysis::{analyze, RecoveryAnalysis, SpikeAnalysis, SpikeImpact, StabilityRating};
pub use error::{AnalysisError, PartialPhases, PhaseError, ScenarioError, SpikeTestError};
pub use events::{ChannelSink, EventSink, FanoutSink, LoadEvent, NoopSink, TracingSink};
pub use metrics::{LatencyStats, MetricsAggregator, PhaseResult, ScenarioBreakdown};
pub use orchestrator::{OrchestratorState, SpikeTestOrchestrator, SpikeTestPlan, SpikeTestResult};
pub use phase::{ramp_schedule, PhaseConfig, PhaseKind, PhaseRunner};
pub use record::{ErrorKind, RequestRecord};
pub use report::{PlanSummary, ReportStatus, SpikeTestReport};
pub use scenario::{BodyFactory, RequestContext, ScenarioMix, ScenarioTemplate};
pub use worker::VirtualUser;

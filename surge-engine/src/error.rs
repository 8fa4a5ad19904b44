//! Engine error types

use crate::metrics::PhaseResult;
use crate::phase::PhaseKind;
use serde::{Deserialize, Serialize};
use surge_config::ConfigError;
use thiserror::Error;

/// Invalid scenario definitions or failure to render one
#[derive(Debug, Clone, Error)]
pub enum ScenarioError {
    #[error("At least one scenario is required")]
    Empty,

    #[error("Duplicate scenario name: {0}")]
    Duplicate(String),

    #[error("Invalid scenario '{name}': {message}")]
    Invalid { name: String, message: String },

    #[error("Failed to render scenario '{name}': {message}")]
    Render { name: String, message: String },
}

impl ScenarioError {
    pub fn invalid(name: &str, message: impl Into<String>) -> Self {
        ScenarioError::Invalid {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn render(name: &str, message: impl Into<String>) -> Self {
        ScenarioError::Render {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of a single phase run
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("Invalid phase configuration: {0}")]
    InvalidConfig(String),

    /// Stopped early by an external interrupt; carries the partial result
    #[error("{} phase interrupted after {}ms", .0.phase, .0.elapsed_ms)]
    Interrupted(Box<PhaseResult>),
}

/// The analysis step cannot compare the phases
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Degenerate baseline: baseline {metric} is zero")]
    DegenerateBaseline { metric: &'static str },

    #[error("Degenerate recovery: recovery p95 latency is zero")]
    DegenerateRecovery,
}

/// Phase results collected before a run stopped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPhases {
    pub baseline: Option<PhaseResult>,
    pub spike: Option<PhaseResult>,
    pub recovery: Option<PhaseResult>,
}

impl PartialPhases {
    pub fn set(&mut self, result: PhaseResult) {
        match result.phase {
            PhaseKind::Baseline => self.baseline = Some(result),
            PhaseKind::Spike => self.spike = Some(result),
            PhaseKind::Recovery => self.recovery = Some(result),
        }
    }

    pub fn get(&self, kind: PhaseKind) -> Option<&PhaseResult> {
        match kind {
            PhaseKind::Baseline => self.baseline.as_ref(),
            PhaseKind::Spike => self.spike.as_ref(),
            PhaseKind::Recovery => self.recovery.as_ref(),
        }
    }

    pub fn completed(&self) -> usize {
        [&self.baseline, &self.spike, &self.recovery]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}

/// Failure of a whole spike test run
#[derive(Debug, Error)]
pub enum SpikeTestError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Spike test interrupted during {phase} phase")]
    Interrupted {
        phase: PhaseKind,
        phases: Box<PartialPhases>,
    },

    #[error("{phase} phase failed: {source}")]
    Phase {
        phase: PhaseKind,
        #[source]
        source: PhaseError,
        phases: Box<PartialPhases>,
    },

    #[error("Analysis failed: {source}")]
    Analysis {
        #[source]
        source: AnalysisError,
        phases: Box<PartialPhases>,
    },

    #[error("Spike test orchestrator has already run; create a new one")]
    AlreadyRun,
}

impl SpikeTestError {
    /// Phase results that remain valid despite the failure
    pub fn partial_phases(&self) -> Option<&PartialPhases> {
        match self {
            SpikeTestError::Interrupted { phases, .. }
            | SpikeTestError::Phase { phases, .. }
            | SpikeTestError::Analysis { phases, .. } => Some(phases),
            SpikeTestError::Configuration(_) | SpikeTestError::AlreadyRun => None,
        }
    }
}

impl From<ConfigError> for SpikeTestError {
    fn from(err: ConfigError) -> Self {
        SpikeTestError::Configuration(err.to_string())
    }
}

impl From<ScenarioError> for SpikeTestError {
    fn from(err: ScenarioError) -> Self {
        SpikeTestError::Configuration(err.to_string())
    }
}

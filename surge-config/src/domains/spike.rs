//! Spike test configuration: target, load shape and scenarios

use crate::error::ConfigResult;
use crate::validation::{
    validate_enum_choice, validate_http_url, validate_positive, validate_required_string,
    Validatable,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// HTTP methods accepted in scenario definitions
pub const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Spike test configuration
///
/// Concurrency targets, the phase duration, the target URL and the scenario
/// list are required. Ramp-up windows default to zero (all virtual users
/// start at once).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeConfig {
    /// Base URL of the service under test
    pub base_url: String,

    /// Virtual users during the baseline phase
    pub baseline_concurrency: usize,

    /// Virtual users during the spike phase
    pub spike_concurrency: usize,

    /// Virtual users during the recovery phase
    pub recovery_concurrency: usize,

    /// Duration of every phase
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub duration: Duration,

    /// Ramp-up window of the baseline phase
    #[serde(default, with = "crate::domains::utils::serde_duration")]
    pub baseline_ramp_up: Duration,

    /// Ramp-up window of the spike phase
    #[serde(default, with = "crate::domains::utils::serde_duration")]
    pub spike_ramp_up: Duration,

    /// Ramp-up window of the recovery phase
    #[serde(default, with = "crate::domains::utils::serde_duration")]
    pub recovery_ramp_up: Duration,

    /// How long in-flight requests may run past a phase deadline.
    /// Defaults to the HTTP request timeout.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::domains::utils::serde_duration_option"
    )]
    pub grace_period: Option<Duration>,

    /// Request templates replayed by every virtual user
    pub scenarios: Vec<ScenarioConfig>,
}

/// A single named request template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    /// Scenario name used in metrics and events
    pub name: String,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// Request path relative to the base URL (may contain placeholders)
    pub path: String,

    /// Request headers (values may contain placeholders)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// JSON body template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,

    /// Relative selection weight within the scenario mix
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Status that counts as success; any other status is a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            baseline_concurrency: 10,
            spike_concurrency: 100,
            recovery_concurrency: 10,
            duration: Duration::from_secs(60),
            baseline_ramp_up: Duration::from_secs(10),
            spike_ramp_up: Duration::from_secs(1),
            recovery_ramp_up: Duration::from_secs(1),
            grace_period: None,
            scenarios: vec![ScenarioConfig::new("health_check", "GET", "/health")],
        }
    }
}

impl ScenarioConfig {
    /// Create a scenario without headers or body
    pub fn new(name: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            weight: default_weight(),
            expected_status: None,
        }
    }
}

impl SpikeConfig {
    /// Largest number of virtual users any phase runs
    pub fn peak_concurrency(&self) -> usize {
        self.baseline_concurrency
            .max(self.spike_concurrency)
            .max(self.recovery_concurrency)
    }
}

impl Validatable for SpikeConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_http_url(&self.base_url, "base_url", self.domain_name())?;

        validate_positive(
            self.baseline_concurrency,
            "baseline_concurrency",
            self.domain_name(),
        )?;
        validate_positive(self.spike_concurrency, "spike_concurrency", self.domain_name())?;
        validate_positive(
            self.recovery_concurrency,
            "recovery_concurrency",
            self.domain_name(),
        )?;
        validate_positive(self.duration.as_secs(), "duration", self.domain_name())?;

        for (field, ramp_up) in [
            ("baseline_ramp_up", self.baseline_ramp_up),
            ("spike_ramp_up", self.spike_ramp_up),
            ("recovery_ramp_up", self.recovery_ramp_up),
        ] {
            if ramp_up >= self.duration {
                return Err(self.validation_error(format!(
                    "{} ({}s) must be shorter than duration ({}s)",
                    field,
                    ramp_up.as_secs(),
                    self.duration.as_secs()
                )));
            }
        }

        if self.spike_ramp_up > Duration::ZERO && self.spike_ramp_up >= self.baseline_ramp_up {
            log::warn!(
                "spike_ramp_up ({}s) is not shorter than baseline_ramp_up ({}s); the spike will not be abrupt",
                self.spike_ramp_up.as_secs(),
                self.baseline_ramp_up.as_secs()
            );
        }

        if self.scenarios.is_empty() {
            return Err(self.validation_error("At least one scenario must be configured"));
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !names.insert(scenario.name.as_str()) {
                return Err(self.validation_error(format!(
                    "Duplicate scenario name '{}'",
                    scenario.name
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "spike"
    }
}

impl Validatable for ScenarioConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.name, "name", self.domain_name())?;
        validate_enum_choice(&self.method, SUPPORTED_METHODS, "method", self.domain_name())?;

        if !self.path.starts_with('/') {
            return Err(self.validation_error(format!(
                "path of scenario '{}' must start with '/', got '{}'",
                self.name, self.path
            )));
        }

        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(self.validation_error(format!(
                "weight of scenario '{}' must be greater than 0, got {}",
                self.name, self.weight
            )));
        }

        if let Some(status) = self.expected_status {
            if !(100..=599).contains(&status) {
                return Err(self.validation_error(format!(
                    "expected_status of scenario '{}' is not a valid HTTP status: {}",
                    self.name, status
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "spike.scenarios"
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_config_defaults_are_valid() {
        let config = SpikeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.spike_concurrency > config.baseline_concurrency);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = SpikeConfig::default();
        config.spike_concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("spike_concurrency"));
    }

    #[test]
    fn test_ramp_up_must_be_shorter_than_duration() {
        let mut config = SpikeConfig::default();
        config.baseline_ramp_up = config.duration;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_scenario_names_rejected() {
        let mut config = SpikeConfig::default();
        config
            .scenarios
            .push(ScenarioConfig::new("health_check", "GET", "/status"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate scenario name"));
    }

    #[test]
    fn test_scenario_validation() {
        assert!(ScenarioConfig::new("list", "get", "/api/tasks").validate().is_ok());
        assert!(ScenarioConfig::new("", "GET", "/").validate().is_err());
        assert!(ScenarioConfig::new("list", "FETCH", "/").validate().is_err());
        assert!(ScenarioConfig::new("list", "GET", "api/tasks").validate().is_err());

        let mut weighted = ScenarioConfig::new("list", "GET", "/");
        weighted.weight = 0.0;
        assert!(weighted.validate().is_err());

        let mut expected = ScenarioConfig::new("create", "POST", "/api/tasks");
        expected.expected_status = Some(201);
        assert!(expected.validate().is_ok());
        expected.expected_status = Some(42);
        assert!(expected.validate().is_err());
    }

    #[test]
    fn test_missing_required_fields_fail_to_parse() {
        let yaml = r#"
base_url: "http://localhost:3000"
baseline_concurrency: 5
duration: 30
scenarios: []
"#;
        let parsed: Result<SpikeConfig, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_ramp_ups_default_to_zero() {
        let yaml = r#"
base_url: "http://localhost:3000"
baseline_concurrency: 5
spike_concurrency: 50
recovery_concurrency: 5
duration: 30
scenarios:
  - name: portfolio
    path: /api/portfolio
"#;
        let config: SpikeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.baseline_ramp_up, Duration::ZERO);
        assert_eq!(config.spike_ramp_up, Duration::ZERO);
        assert_eq!(config.grace_period, None);
        assert_eq!(config.scenarios[0].method, "GET");
        assert_eq!(config.scenarios[0].weight, 1.0);
        assert!(config.validate().is_ok());
    }
}

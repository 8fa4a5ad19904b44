//! Scenario templates, the weighted scenario mix, and per-request rendering

use crate::error::ScenarioError;
use crate::phase::PhaseKind;
use chrono::Utc;
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use surge_config::ScenarioConfig;
use surge_http::{HttpMethod, PreparedRequest, RequestBody};
use url::Url;
use uuid::Uuid;

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
});

/// Who is issuing a request, exposed to templates as placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub worker: usize,
    pub iteration: u64,
    pub phase: PhaseKind,
}

type BodyGenerator = Arc<dyn Fn(&RequestContext) -> JsonValue + Send + Sync>;

/// Source of a request body
#[derive(Clone)]
pub enum BodyFactory {
    /// JSON document whose string leaves may contain placeholders
    Template(JsonValue),
    /// Body computed per request
    Generator(BodyGenerator),
}

impl fmt::Debug for BodyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyFactory::Template(value) => f.debug_tuple("Template").field(value).finish(),
            BodyFactory::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// One kind of request a virtual user can issue
#[derive(Debug, Clone)]
pub struct ScenarioTemplate {
    pub name: String,
    pub method: HttpMethod,
    /// Path relative to the phase base URL, may contain placeholders
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<BodyFactory>,
    /// Relative selection weight within the mix
    pub weight: f64,
    /// Only this status counts as success when set
    pub expected_status: Option<u16>,
}

impl ScenarioTemplate {
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            weight: 1.0,
            expected_status: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: JsonValue) -> Self {
        self.body = Some(BodyFactory::Template(body));
        self
    }

    pub fn with_body_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&RequestContext) -> JsonValue + Send + Sync + 'static,
    {
        self.body = Some(BodyFactory::Generator(Arc::new(generator)));
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    /// Build a template from its configuration form
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, ScenarioError> {
        let method = config
            .method
            .parse::<HttpMethod>()
            .map_err(|e| ScenarioError::invalid(&config.name, e.to_string()))?;

        let template = Self {
            name: config.name.clone(),
            method,
            path: config.path.clone(),
            headers: config.headers.clone(),
            body: config.body.clone().map(BodyFactory::Template),
            weight: config.weight,
            expected_status: config.expected_status,
        };
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::invalid(&self.name, "name cannot be empty"));
        }
        if !self.path.starts_with('/') {
            return Err(ScenarioError::invalid(&self.name, "path must start with '/'"));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ScenarioError::invalid(
                &self.name,
                format!("weight must be positive, got {}", self.weight),
            ));
        }
        if let Some(status) = self.expected_status {
            if !(100..=599).contains(&status) {
                return Err(ScenarioError::invalid(
                    &self.name,
                    format!("expected_status {} is not an HTTP status", status),
                ));
            }
        }

        let templated = std::iter::once(self.path.as_str()).chain(self.headers.values().map(String::as_str));
        for text in templated {
            handlebars::Template::compile(text).map_err(|e| {
                ScenarioError::invalid(&self.name, format!("invalid placeholder in '{}': {}", text, e))
            })?;
        }

        Ok(())
    }

    /// Render this template into a concrete request against `base_url`
    pub fn render(&self, base_url: &Url, context: &RequestContext) -> Result<PreparedRequest, ScenarioError> {
        let vars = placeholder_values(context);

        let path = render_text(&self.path, &vars).map_err(|e| ScenarioError::render(&self.name, e))?;
        let raw_url = format!("{}{}", base_url.as_str().trim_end_matches('/'), path);
        let url = Url::parse(&raw_url).map_err(|e| ScenarioError::render(&self.name, format!("{}: {}", raw_url, e)))?;

        let headers = self
            .headers
            .iter()
            .map(|(name, value)| Ok((name.clone(), render_text(value, &vars)?)))
            .collect::<Result<Vec<_>, String>>()
            .map_err(|e| ScenarioError::render(&self.name, e))?;

        let body = match &self.body {
            None => None,
            Some(BodyFactory::Template(value)) => Some(RequestBody::Json(
                render_json(value, &vars).map_err(|e| ScenarioError::render(&self.name, e))?,
            )),
            Some(BodyFactory::Generator(generate)) => Some(RequestBody::Json(generate(context))),
        };

        Ok(PreparedRequest {
            method: self.method,
            url,
            headers,
            body,
        })
    }
}

fn placeholder_values(context: &RequestContext) -> JsonValue {
    json!({
        "worker": context.worker,
        "iteration": context.iteration,
        "phase": context.phase.as_str(),
        "uuid": Uuid::new_v4().to_string(),
        "timestamp": Utc::now().timestamp_millis(),
    })
}

fn render_text(text: &str, vars: &JsonValue) -> Result<String, String> {
    if !text.contains("{{") {
        return Ok(text.to_string());
    }
    TEMPLATES.render_template(text, vars).map_err(|e| e.to_string())
}

fn render_json(value: &JsonValue, vars: &JsonValue) -> Result<JsonValue, String> {
    Ok(match value {
        JsonValue::String(text) => JsonValue::String(render_text(text, vars)?),
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| render_json(item, vars))
                .collect::<Result<Vec<_>, String>>()?,
        ),
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), render_json(v, vars)?)))
                .collect::<Result<_, String>>()?,
        ),
        other => other.clone(),
    })
}

/// Weighted set of scenarios shared read-only by all workers
#[derive(Debug, Clone)]
pub struct ScenarioMix {
    scenarios: Vec<Arc<ScenarioTemplate>>,
    cumulative: Vec<f64>,
}

impl ScenarioMix {
    pub fn new(scenarios: Vec<ScenarioTemplate>) -> Result<Self, ScenarioError> {
        if scenarios.is_empty() {
            return Err(ScenarioError::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        let mut cumulative = Vec::with_capacity(scenarios.len());
        let mut total = 0.0;
        for scenario in &scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(ScenarioError::Duplicate(scenario.name.clone()));
            }
            total += scenario.weight;
            cumulative.push(total);
        }

        Ok(Self {
            scenarios: scenarios.into_iter().map(Arc::new).collect(),
            cumulative,
        })
    }

    /// Pick a scenario with probability proportional to its weight
    pub fn pick(&self, rng: &mut fastrand::Rng) -> &Arc<ScenarioTemplate> {
        let total = self.cumulative[self.cumulative.len() - 1];
        let target = rng.f64() * total;
        let index = self
            .cumulative
            .iter()
            .position(|&edge| target < edge)
            .unwrap_or(self.scenarios.len() - 1);
        &self.scenarios[index]
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ScenarioTemplate>> {
        self.scenarios.iter()
    }
}

//! Template engine for report paths

use crate::errors::ReportWriteError;
use handlebars::Handlebars;
use serde_json::Value;
use std::collections::HashMap;

/// Template engine for variable substitution using Handlebars
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true); // Error on missing variables
        handlebars.register_escape_fn(handlebars::no_escape);

        Self { handlebars }
    }

    /// Render a template with the given variables
    pub fn render(&self, template: &str, variables: &HashMap<String, String>) -> Result<String, ReportWriteError> {
        let json_vars: Value = variables
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>()
            .into();

        self.handlebars
            .render_template(template, &json_vars)
            .map_err(|e| ReportWriteError::TemplateRender {
                template: template.to_string(),
                error: e.to_string(),
            })
    }

    /// Validate that a template is syntactically correct
    pub fn validate(&self, template: &str) -> Result<(), ReportWriteError> {
        handlebars::Template::compile(template)
            .map(|_| ())
            .map_err(|e| ReportWriteError::TemplateRender {
                template: template.to_string(),
                error: e.to_string(),
            })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

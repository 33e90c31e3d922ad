//! Templated message values.
//!
//! A message string is either a raw handlebars template or an already
//! rendered value. Tracking the distinction in the type means a value can
//! never be rendered twice, however many times it passes through `compile`.

use std::collections::BTreeMap;

use handlebars::{Handlebars, RenderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatedMessage {
    Raw(String),
    Compiled(String),
}

impl TemplatedMessage {
    /// Render a raw template against the model; compiled values pass through
    /// untouched.
    pub fn compile(self, model: &BTreeMap<&str, String>) -> Result<TemplatedMessage, RenderError> {
        match self {
            TemplatedMessage::Raw(template) => {
                let rendered = Handlebars::new().render_template(&template, model)?;
                Ok(TemplatedMessage::Compiled(rendered))
            }
            compiled @ TemplatedMessage::Compiled(_) => Ok(compiled),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            TemplatedMessage::Raw(value) | TemplatedMessage::Compiled(value) => value,
        }
    }
}

/// Render a template string in one step.
pub fn render(template: &str, model: &BTreeMap<&str, String>) -> Result<String, RenderError> {
    Ok(TemplatedMessage::Raw(template.to_string())
        .compile(model)?
        .value()
        .to_string())
}

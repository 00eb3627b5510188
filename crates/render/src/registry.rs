use std::io::{self, Write};

use beehive_types::OutputFormat;
use indexmap::IndexMap;
use tracing::warn;

use crate::{
    DetailsVertical, DynamicTemplate, Json, Mixed, RenderError, RenderOptions, RenderRequest, Renderer, Tabular, Yaml,
};

/// The output handlers, keyed by name.
pub struct RenderRegistry {
    handlers: IndexMap<&'static str, Box<dyn Renderer>>,
}

impl Default for RenderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRegistry").field("handlers", &self.names()).finish()
    }
}

impl RenderRegistry {
    /// Registry with the seven built-in handlers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Tabular::plain()));
        registry.register(Box::new(Tabular::colored()));
        registry.register(Box::new(Json));
        registry.register(Box::new(Yaml));
        registry.register(Box::new(DetailsVertical));
        registry.register(Box::new(Mixed));
        registry.register(Box::new(DynamicTemplate));
        registry
    }

    pub fn empty() -> Self {
        Self {
            handlers: IndexMap::new(),
        }
    }

    /// Add or replace a handler.
    pub fn register(&mut self, handler: Box<dyn Renderer>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Renderer> {
        self.handlers.get(name).map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Handler serving `format`.
    pub fn handler_name(format: OutputFormat, details: bool) -> &'static str {
        match format {
            OutputFormat::Text | OutputFormat::ColorText if details => DetailsVertical::NAME,
            OutputFormat::Text => Tabular::PLAIN,
            OutputFormat::ColorText => Tabular::COLORED,
            OutputFormat::Json => Json::NAME,
            OutputFormat::Yaml => Yaml::NAME,
            OutputFormat::Mixed => Mixed::NAME,
            OutputFormat::Dynamic => DynamicTemplate::NAME,
        }
    }

    /// Render with the handler for `format`.
    ///
    /// A failing handler never fails the command: a warning line and a pretty
    /// JSON dump of the data are written instead.
    pub fn render(
        &self,
        format: OutputFormat,
        request: &RenderRequest,
        options: &RenderOptions,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let name = Self::handler_name(format, request.details);
        let mut buffer = Vec::new();
        let result = match self.get(name) {
            Some(handler) => {
                let options = RenderOptions {
                    color: options.color && format.is_colored() && handler.is_textual(),
                    ..options.clone()
                };
                handler.render(request, &options, &mut buffer)
            }
            None => Err(RenderError::UnknownHandler(name.to_string())),
        };
        match result {
            Ok(()) => out.write_all(&buffer),
            Err(err) => {
                warn!(handler = name, error = %err, "render failed");
                writeln!(out, "warning: render failed ({err})")?;
                let dump = serde_json::to_string_pretty(&request.data).unwrap_or_else(|_| request.data.to_string());
                writeln!(out, "{dump}")
            }
        }
    }
}

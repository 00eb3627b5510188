//! What a command asks the active handler to print.

use std::{fmt, sync::Arc};

use beehive_util::StyleEngine;
use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::TemplateStore;

/// Formats one field for display. Receives `null` for missing fields.
pub type Transform = Arc<dyn Fn(&Value, &StyleEngine) -> String + Send + Sync>;

/// Splits an object into a head and titled sections for mixed output.
pub type ManageData = Arc<dyn Fn(&Value) -> ManagedData + Send + Sync>;

/// Table border preset.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum TableStyle {
    #[default]
    Simple,
    Plain,
    Grid,
    Fancy,
    Markdown,
}

/// Display text for booleans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoolMap {
    pub true_text: String,
    pub false_text: String,
}

impl Default for BoolMap {
    fn default() -> Self {
        Self::new("true", "false")
    }
}

impl BoolMap {
    pub fn new(true_text: impl Into<String>, false_text: impl Into<String>) -> Self {
        Self {
            true_text: true_text.into(),
            false_text: false_text.into(),
        }
    }

    pub fn text(&self, value: bool) -> &str {
        if value { &self.true_text } else { &self.false_text }
    }
}

/// A titled table printed under the head of a mixed render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub title: String,
    pub headers: Vec<String>,
    pub fields: Vec<String>,
    pub rows: Value,
}

impl Section {
    pub fn new(title: impl Into<String>, rows: Value) -> Self {
        Self {
            title: title.into(),
            rows,
            ..Self::default()
        }
    }

    pub fn columns<I, S>(mut self, headers: I, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of a [`ManageData`] callback.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagedData {
    pub head: Value,
    pub sections: Vec<Section>,
}

/// Everything a handler needs to print one response.
#[derive(Clone)]
pub struct RenderRequest {
    pub data: Value,
    /// Dotted path to descend into before rendering.
    pub key: Option<String>,
    /// Column labels, parallel to `fields`.
    pub headers: Vec<String>,
    /// Dotted paths extracted per row.
    pub fields: Vec<String>,
    /// Vertical `attrib`/`value` layout.
    pub details: bool,
    pub transforms: IndexMap<String, Transform>,
    pub table_style: TableStyle,
    pub max_column_width: Option<usize>,
    pub show_index: bool,
    pub show_headers: bool,
    pub manage_data: Option<ManageData>,
    /// Joins the lines of the dynamic handler.
    pub separator: Option<String>,
    /// Template name or inline template for the dynamic handler.
    pub template: Option<String>,
    pub bool_map: BoolMap,
}

impl fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRequest")
            .field("data", &self.data)
            .field("key", &self.key)
            .field("headers", &self.headers)
            .field("fields", &self.fields)
            .field("details", &self.details)
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("table_style", &self.table_style)
            .field("max_column_width", &self.max_column_width)
            .field("show_index", &self.show_index)
            .field("show_headers", &self.show_headers)
            .field("manage_data", &self.manage_data.is_some())
            .field("separator", &self.separator)
            .field("template", &self.template)
            .finish()
    }
}

impl RenderRequest {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            key: None,
            headers: Vec::new(),
            fields: Vec::new(),
            details: false,
            transforms: IndexMap::new(),
            table_style: TableStyle::default(),
            max_column_width: None,
            show_index: false,
            show_headers: true,
            manage_data: None,
            separator: None,
            template: None,
            bool_map: BoolMap::default(),
        }
    }

    /// A plain message, printed verbatim by every handler.
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(json!({"msg": text.into()})).transform("msg", |value, _| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn details(mut self) -> Self {
        self.details = true;
        self
    }

    pub fn transform<F>(mut self, field: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Value, &StyleEngine) -> String + Send + Sync + 'static,
    {
        self.transforms.insert(field.into(), Arc::new(transform));
        self
    }

    pub fn table_style(mut self, style: TableStyle) -> Self {
        self.table_style = style;
        self
    }

    pub fn max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = Some(width);
        self
    }

    pub fn show_index(mut self) -> Self {
        self.show_index = true;
        self
    }

    pub fn hide_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    pub fn manage_data<F>(mut self, manage: F) -> Self
    where
        F: Fn(&Value) -> ManagedData + Send + Sync + 'static,
    {
        self.manage_data = Some(Arc::new(manage));
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn bool_map(mut self, bool_map: BoolMap) -> Self {
        self.bool_map = bool_map;
        self
    }
}

/// Per-invocation rendering state.
#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    pub color: bool,
    pub notruncate: bool,
    /// `--fields`: replaces the command's columns.
    pub fields: Vec<String>,
    /// `--afields`: appended to the command's columns.
    pub afields: Vec<String>,
    pub templates: Arc<TemplateStore>,
}

impl RenderOptions {
    pub fn style(&self) -> StyleEngine {
        StyleEngine::new(self.color)
    }
}

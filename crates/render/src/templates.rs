//! Named line templates for the dynamic handler.
//!
//! A template is plain text with `{dotted.path}` placeholders resolved against
//! each row; `{{` and `}}` stand for literal braces.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use beehive_util::multi_get_text;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::RenderError;

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: IndexMap<String, String>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` as `<plugin>/<stem>`, and as `<stem>` unless another
    /// plugin already claimed that name.
    pub fn insert(&mut self, plugin: &str, stem: &str, body: impl Into<String>) {
        let body = body.into();
        self.templates.entry(stem.to_string()).or_insert_with(|| body.clone());
        self.templates.insert(format!("{plugin}/{stem}"), body);
    }

    /// Load every file of `dir` as a template of `plugin`. Returns the count.
    pub fn load_dir(&mut self, plugin: &str, dir: &Path) -> Result<usize, RenderError> {
        let read_error = |path: &Path, source| RenderError::TemplateDir {
            path: path.to_path_buf(),
            source,
        };
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| read_error(dir, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        let mut loaded = 0;
        for path in &files {
            let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
                continue;
            };
            let body = fs::read_to_string(path).map_err(|e| read_error(path.as_path(), e))?;
            self.insert(plugin, stem, body.trim_end_matches(['\n', '\r']));
            loaded += 1;
        }
        debug!(plugin, loaded, dir = %dir.display(), "templates loaded");
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Fill the placeholders of `template` from `row`.
pub fn fill_template(template: &str, row: &Value) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut path = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => path.push(c),
                        None => return Err(format!("unclosed placeholder '{{{path}'")),
                    }
                }
                out.push_str(&multi_get_text(row, path.trim()));
            }
            '}' => return Err("unmatched '}'".to_string()),
            other => out.push(other),
        }
    }
    Ok(out)
}

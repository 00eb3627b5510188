//! Compiled-in plugins and their on-disk companions.
//!
//! Every plugin may have a directory named after it under the plugin path:
//!
//! ```text
//! <plugin_path>/
//!   entities/
//!     plugin.yml      # enabled: false  turns the plugin off
//!     templates/      # one file per template for the dynamic format
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use beehive_render::TemplateStore;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{ControllerRegistry, RegistryError};

pub const MANIFEST_FILE: &str = "plugin.yml";
pub const TEMPLATES_DIR: &str = "templates";

/// A set of controllers shipped together.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register the plugin's controllers.
    fn load(&self, registry: &mut ControllerRegistry) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone, Deserialize)]
struct PluginManifest {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Outcome of loading one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlugin {
    pub name: &'static str,
    pub templates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PluginLoader {
    root: Option<PathBuf>,
}

impl PluginLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    /// Loader that registers every plugin without looking at the disk.
    pub fn without_directory() -> Self {
        Self::default()
    }

    /// Register the enabled plugins and collect their templates.
    pub fn load(
        &self,
        plugins: &[Box<dyn Plugin>],
        registry: &mut ControllerRegistry,
        templates: &mut TemplateStore,
    ) -> Result<Vec<LoadedPlugin>, RegistryError> {
        let mut loaded = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            let name = plugin.name();
            let dir = self.root.as_ref().map(|root| root.join(name));
            let manifest = match &dir {
                Some(dir) => read_manifest(&dir.join(MANIFEST_FILE))?,
                None => PluginManifest::default(),
            };
            if !manifest.enabled {
                info!(plugin = name, "plugin disabled");
                continue;
            }
            plugin.load(registry)?;
            let template_dir = dir.map(|dir| dir.join(TEMPLATES_DIR)).filter(|dir| dir.is_dir());
            let count = match template_dir {
                Some(template_dir) => templates.load_dir(name, &template_dir)?,
                None => 0,
            };
            debug!(plugin = name, templates = count, "plugin loaded");
            loaded.push(LoadedPlugin { name, templates: count });
        }
        Ok(loaded)
    }
}

fn read_manifest(path: &Path) -> Result<PluginManifest, RegistryError> {
    if !path.is_file() {
        return Ok(PluginManifest::default());
    }
    let manifest_error = |reason: String| RegistryError::Manifest {
        path: path.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(PluginManifest::default());
    }
    serde_yaml::from_str(&text).map_err(|e| manifest_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControllerDescriptor, test_support::StubController};

    struct Demo(&'static str);

    impl Plugin for Demo {
        fn name(&self) -> &'static str {
            self.0
        }

        fn load(&self, registry: &mut ControllerRegistry) -> Result<(), RegistryError> {
            registry.register(StubController::new(ControllerDescriptor::new(self.0, "base", "demo")))
        }
    }

    fn plugins() -> Vec<Box<dyn Plugin>> {
        vec![Box::new(Demo("alpha")), Box::new(Demo("beta"))]
    }

    fn registry() -> ControllerRegistry {
        let mut registry = ControllerRegistry::new();
        registry
            .register(StubController::new(ControllerDescriptor::base("root")))
            .expect("base");
        registry
    }

    #[test]
    fn honours_manifests_and_loads_templates() {
        let root = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join("alpha/templates")).expect("mkdir");
        fs::write(root.path().join("alpha/templates/line.tpl"), "{id}").expect("write");
        fs::create_dir_all(root.path().join("beta")).expect("mkdir");
        fs::write(root.path().join("beta/plugin.yml"), "enabled: false\n").expect("write");

        let mut registry = registry();
        let mut templates = TemplateStore::new();
        let loaded = PluginLoader::new(root.path())
            .load(&plugins(), &mut registry, &mut templates)
            .expect("load");

        assert_eq!(loaded, vec![LoadedPlugin { name: "alpha", templates: 1 }]);
        assert!(registry.get("base.alpha").is_some());
        assert!(registry.get("base.beta").is_none());
        assert_eq!(templates.get("alpha/line"), Some("{id}"));
    }

    #[test]
    fn missing_directories_enable_everything() {
        let mut registry = registry();
        let mut templates = TemplateStore::new();
        let loaded = PluginLoader::new("/nonexistent/plugins")
            .load(&plugins(), &mut registry, &mut templates)
            .expect("load");
        assert_eq!(loaded.len(), 2);
        assert!(templates.is_empty());
    }

    #[test]
    fn malformed_manifests_are_reported() {
        let root = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join("alpha")).expect("mkdir");
        fs::write(root.path().join("alpha/plugin.yml"), "enabled: [").expect("write");
        let err = PluginLoader::new(root.path())
            .load(&plugins(), &mut registry(), &mut TemplateStore::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Manifest { .. }));
    }
}

//! File access for the configuration tree.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use beehive_util::{beehive_home, expand_tilde};
use serde_json::Value;
use tracing::debug;

use crate::ConfigError;

/// Environment variable overriding the main configuration file location.
pub const CONFIG_PATH_ENV: &str = "BEEHIVE_CFG";

/// Returns the main configuration file path.
///
/// `BEEHIVE_CFG` wins when set and non-empty; otherwise
/// `$HOME/.beehive3/config/beehive.yml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    beehive_home().join("config").join("beehive.yml")
}

/// Read a YAML file into a JSON document. An empty file is an empty mapping.
pub fn read_yaml_document(path: &Path) -> Result<Value, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::parse(path, e))?;
    debug!(path = %path.display(), "loaded configuration file");
    match document {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(document),
        _ => Err(ConfigError::parse(path, "top level must be a mapping")),
    }
}

/// Overlay files for an environment, in lexical order.
///
/// A missing overlay directory yields no overlays.
pub fn overlay_files(directory: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !directory.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(directory).map_err(|source| ConfigError::Read {
        path: directory.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && has_yaml_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Environment names available under the environment directory.
pub fn environment_names(directory: &Path) -> Result<Vec<String>, ConfigError> {
    let mut names: Vec<String> = overlay_files(directory)?
        .iter()
        .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string))
        .collect();
    names.dedup();
    Ok(names)
}

fn has_yaml_extension(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("yml" | "yaml"))
}

/// Merge `overlay` into `base`: mappings merge recursively, anything else replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Resolve a configured path: tilde expansion, then relative to `base_dir`.
pub fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let expanded = expand_tilde(raw);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

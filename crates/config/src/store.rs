//! The process-wide configuration store.

use std::{
    env,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::info;

use crate::{
    ConfigError, LoadedEnvironment, MainConfig,
    interpolation::{interpolate_env, interpolate_vault},
    io::{default_config_path, deep_merge, environment_names, overlay_files, read_yaml_document, resolve_path},
    model::build_environment,
    validation::{validate_environment, validate_label},
};

/// Process environment variable that overrides `beehive.default_env`.
pub const ENV_OVERRIDE_VAR: &str = "BEEHIVE_ENV";

/// Per-invocation choices that influence which environment is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSelection {
    /// `--env` from the command line.
    pub env: Option<String>,
    /// `--vault` from the command line.
    pub vault: Option<String>,
}

/// Lazily loads the main file and the active environment, each at most once.
///
/// The first successful [`ConfigStore::environment`] call fixes the
/// environment for the rest of the process.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    main: OnceCell<MainConfig>,
    environment: OnceCell<LoadedEnvironment>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            main: OnceCell::new(),
            environment: OnceCell::new(),
        }
    }

    /// Store over `BEEHIVE_CFG` or `$HOME/.beehive3/config/beehive.yml`.
    pub fn from_default_location() -> Self {
        Self::new(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn main(&self) -> Result<&MainConfig, ConfigError> {
        self.main.get_or_try_init(|| load_main_config(&self.path))
    }

    /// Pick the environment name: `--env`, then `BEEHIVE_ENV`, then the configured default.
    pub fn resolve_env_name(&self, cli_env: Option<&str>) -> Result<String, ConfigError> {
        if let Some(name) = cli_env.map(str::trim).filter(|name| !name.is_empty()) {
            return Ok(name.to_string());
        }
        if let Ok(name) = env::var(ENV_OVERRIDE_VAR)
            && !name.trim().is_empty()
        {
            return Ok(name.trim().to_string());
        }
        self.main()?.default_env.clone().ok_or(ConfigError::NoEnvironment)
    }

    pub fn environment(&self, selection: &EnvSelection) -> Result<&LoadedEnvironment, ConfigError> {
        self.environment.get_or_try_init(|| {
            let name = self.resolve_env_name(selection.env.as_deref())?;
            load_environment(self.main()?, &name, selection.vault.as_deref())
        })
    }

    /// The environment, if an earlier call already loaded it.
    pub fn loaded(&self) -> Option<&LoadedEnvironment> {
        self.environment.get()
    }

    /// Names of the environments defined under the environment directory.
    pub fn environment_names(&self) -> Result<Vec<String>, ConfigError> {
        environment_names(&self.main()?.environment_config_path)
    }
}

/// Read, interpolate and interpret the main configuration file.
pub fn load_main_config(path: &Path) -> Result<MainConfig, ConfigError> {
    let mut document = read_yaml_document(path)?;
    interpolate_env(&mut document)?;
    MainConfig::from_document(path, document)
}

/// Load `<env dir>/<name>.yml`, its overlays and its vault.
pub fn load_environment(main: &MainConfig, name: &str, vault_override: Option<&str>) -> Result<LoadedEnvironment, ConfigError> {
    let directory = &main.environment_config_path;
    let base = directory.join(format!("{name}.yml"));
    if validate_label("environment", name).is_err() || !base.is_file() {
        return Err(ConfigError::UnknownEnvironment {
            name: name.to_string(),
            path: base,
        });
    }

    let mut document = read_yaml_document(&base)?;
    let mut sources = vec![base];
    for overlay in overlay_files(&directory.join(name))? {
        deep_merge(&mut document, read_yaml_document(&overlay)?);
        sources.push(overlay);
    }
    interpolate_env(&mut document)?;

    let vault_path = vault_override
        .map(str::to_string)
        .or_else(|| document.get("vault").and_then(Value::as_str).map(str::to_string));
    let secrets = vault_path
        .as_deref()
        .map(|raw| load_vault(&resolve_path(directory, raw)))
        .transpose()?;
    interpolate_vault(&mut document, secrets.as_ref())?;
    if let (Some(raw), Value::Object(map)) = (vault_override, &mut document) {
        map.insert("vault".to_string(), Value::String(raw.to_string()));
    }

    let environment = build_environment(name, &document, directory)?;
    validate_environment(&environment)?;
    info!(environment = name, files = sources.len(), "environment loaded");
    Ok(LoadedEnvironment::new(environment, sources, document, secrets.unwrap_or_default()))
}

fn load_vault(path: &Path) -> Result<IndexMap<String, String>, ConfigError> {
    let document = read_yaml_document(path)?;
    let Value::Object(map) = document else {
        return Err(ConfigError::parse(path, "vault must be a mapping"));
    };
    map.into_iter()
        .map(|(name, value)| match value {
            Value::String(secret) => Ok((name, secret)),
            Value::Number(number) => Ok((name, number.to_string())),
            Value::Bool(flag) => Ok((name, flag.to_string())),
            _ => Err(ConfigError::parse(path, format!("vault entry '{name}' must be a scalar"))),
        })
        .collect()
}

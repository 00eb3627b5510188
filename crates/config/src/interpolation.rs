//! Placeholder interpolation for configuration documents.
//!
//! Two placeholder kinds are understood: `${env:NAME}` reads the process
//! environment and `${vault:NAME}` reads the loaded vault. Interpolation runs
//! per kind so the vault location itself may use `${env:...}`.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::ConfigError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(env|vault):([A-Za-z0-9_.\-]+)\}").expect("placeholder regex should compile"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderKind {
    Env,
    Vault,
}

impl PlaceholderKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Vault => "vault",
        }
    }
}

/// Replace every `${env:NAME}` in the string leaves of `document`.
pub fn interpolate_env(document: &mut Value) -> Result<(), ConfigError> {
    interpolate_value(document, "", PlaceholderKind::Env, &|name| std::env::var(name).ok())
}

/// Replace every `${vault:NAME}` using `secrets`; `None` means no vault is configured.
pub fn interpolate_vault(document: &mut Value, secrets: Option<&IndexMap<String, String>>) -> Result<(), ConfigError> {
    interpolate_value(document, "", PlaceholderKind::Vault, &|name| {
        secrets.and_then(|secrets| secrets.get(name).cloned())
    })
}

fn interpolate_value(
    value: &mut Value,
    path: &str,
    kind: PlaceholderKind,
    resolve: &dyn Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    match value {
        Value::String(text) => {
            if let Some(replaced) = interpolate_string(text, path, kind, resolve)? {
                *text = replaced;
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                interpolate_value(item, &join(path, &index.to_string()), kind, resolve)?;
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                interpolate_value(item, &join(path, key), kind, resolve)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Returns `Ok(None)` when the string holds no placeholder of `kind`.
fn interpolate_string(
    text: &str,
    path: &str,
    kind: PlaceholderKind,
    resolve: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<String>, ConfigError> {
    let mut failure = None;
    let mut touched = false;
    let replaced = PLACEHOLDER.replace_all(text, |captures: &Captures| {
        if &captures[1] != kind.tag() {
            return captures[0].to_string();
        }
        touched = true;
        let name = &captures[2];
        match resolve(name) {
            Some(resolved) => {
                debug!(key = path, placeholder = kind.tag(), name, "interpolated [REDACTED]");
                resolved
            }
            None => {
                if failure.is_none() {
                    failure = Some(ConfigError::Interpolation {
                        key: path.to_string(),
                        placeholder: captures[0].to_string(),
                        reason: match kind {
                            PlaceholderKind::Env => format!("environment variable {name} is not set"),
                            PlaceholderKind::Vault => format!("secret {name} is not in the vault"),
                        },
                    });
                }
                String::new()
            }
        }
    });
    if let Some(failure) = failure {
        return Err(failure);
    }
    Ok(touched.then(|| replaced.into_owned()))
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

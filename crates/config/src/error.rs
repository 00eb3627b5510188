use std::path::PathBuf;

use beehive_types::EndpointParseError;
use thiserror::Error;

/// Errors raised while locating, reading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration in {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("no environment selected: pass --env, set BEEHIVE_ENV or configure beehive.default_env")]
    NoEnvironment,

    #[error("unknown environment '{name}' (expected {})", path.display())]
    UnknownEnvironment { name: String, path: PathBuf },

    #[error("cannot resolve {placeholder} in '{key}': {reason}")]
    Interpolation {
        key: String,
        placeholder: String,
        reason: String,
    },

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error(transparent)]
    Endpoint(#[from] EndpointParseError),
}

impl ConfigError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

use std::{io, path::PathBuf};

use beehive_api::ApiError;
use beehive_config::ConfigError;
use beehive_render::RenderError;
use thiserror::Error;

/// Problems found while registering or validating controllers.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command '{path}' is registered twice")]
    DuplicateCommand { path: String },

    #[error("controller '{controller}' is stacked on unknown parent '{parent}'")]
    UnknownParent { controller: String, parent: String },

    #[error("argument '{argument}' of '{command}' collides with a global flag")]
    ArgumentCollision { command: String, argument: String },

    #[error("argument '{argument}' is declared twice in '{command}'")]
    DuplicateArgument { command: String, argument: String },

    #[error("no controller registered at '{0}'")]
    UnknownController(String),

    #[error("plugin '{name}': {reason}")]
    Plugin { name: String, reason: String },

    #[error("cannot read plugin manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error(transparent)]
    Templates(#[from] RenderError),
}

/// Everything a dispatched command can end with.
///
/// [`KernelError::exit_code`] decides what the process reports.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Assertion(String),

    #[error("{0}")]
    Manager(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<io::Error> for KernelError {
    fn from(err: io::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl KernelError {
    pub fn manager(message: impl Into<String>) -> Self {
        Self::Manager(message.into())
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// One-word category printed in front of the diagnostic.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Usage(_) => "UsageError",
            Self::Config(_) => "ConfigError",
            Self::Api(err) => err.category(),
            Self::Registry(_) => "RegistryError",
            Self::Assertion(_) => "AssertionError",
            Self::Manager(_) => "ManagerError",
            Self::Cancelled => "Cancelled",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 0,
            Self::Internal(_) => 255,
            _ => 1,
        }
    }
}

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot serialize output as {format}: {reason}")]
    Serialize { format: &'static str, reason: String },

    #[error("the dynamic format needs a template")]
    MissingTemplate,

    #[error("template '{name}': {reason}")]
    Template { name: String, reason: String },

    #[error("cannot read templates from {path}: {source}")]
    TemplateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no renderer named '{0}'")]
    UnknownHandler(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

//! Configuration store for the Beehive CLI.
//!
//! The main file (`beehive.yml`) names the default environment and where
//! environment files live. Each environment is `<env dir>/<name>.yml`, deep
//! merged with the overlays in `<env dir>/<name>/`, interpolated
//! (`${env:NAME}`, `${vault:NAME}`), interpreted into an
//! [`beehive_types::Environment`] and validated.

mod error;
mod interpolation;
mod io;
mod model;
mod store;
mod validation;

pub use error::ConfigError;
pub use interpolation::{interpolate_env, interpolate_vault};
pub use io::{CONFIG_PATH_ENV, deep_merge, default_config_path, read_yaml_document, resolve_path};
pub use model::{DEFAULT_PAGE_CAP, LoadedEnvironment, MainConfig, build_environment};
pub use store::{ConfigStore, ENV_OVERRIDE_VAR, EnvSelection, load_environment, load_main_config};
pub use validation::{validate_environment, validate_label};

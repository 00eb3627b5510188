//! Plugins compiled into `beehive3`.

mod base;
mod entities;

use beehive_registry::Plugin;

pub use base::{BasePlugin, EnvironmentsController, OrchestratorsController, VersionController};
pub use entities::{EntitiesController, EntitiesPlugin};

/// Every built-in plugin, in registration order.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(BasePlugin), Box::new(EntitiesPlugin)]
}

//! Controller registry and argument parser of the Beehive CLI kernel.
//!
//! Plugins register [`Controller`]s, each described by a
//! [`ControllerDescriptor`] stacked on a parent path rooted at `base`. The
//! registry validates the tree, prunes it to what an invocation needs, and
//! [`build_parser`] turns it into a `clap` command tree. The dispatcher lives
//! in the CLI crate; the contracts it hands to controllers
//! ([`CommandContext`], [`KernelServices`], [`InvocationContext`]) live here.

pub mod clap_builder;
mod context;
mod controller;
mod descriptor;
mod error;
pub mod models;
pub mod plugin;

#[cfg(test)]
mod test_support;

pub use clap_builder::{Dispatch, GLOBAL_HEADING, build_parser, dispatch_target, normalize_legacy_args};
pub use context::{CommandContext, InvocationContext, KernelServices};
pub use controller::{Controller, ParseHints};
pub use descriptor::{
    ArgumentFormatter, BASE_LABEL, CommandDescriptor, ControllerDescriptor, ControllerKind, DISPATCH_ARGUMENT,
    GLOBAL_ARGUMENTS, PAGING_ARGUMENTS, Stacking,
};
pub use error::{KernelError, RegistryError};
pub use models::{ControllerRegistry, RegisteredController};
pub use plugin::{LoadedPlugin, Plugin, PluginLoader};

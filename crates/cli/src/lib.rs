//! The `beehive3` command line: dispatcher, logging setup and the built-in
//! plugins. The binary is a thin wrapper around [`App`].

pub mod app;
pub mod logging;
pub mod plugins;

pub use app::{App, BIN_NAME, VERSION};

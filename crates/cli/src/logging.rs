//! Diagnostics setup for the `beehive3` binary.
//!
//! Filter precedence is `RUST_LOG`, then `log.clilog.level` from the main
//! file, then `warn`. Curl traces use their own target and stay visible at
//! `info` unless `RUST_LOG` says otherwise.

use std::{
    fs::{self, OpenOptions},
    io::{self, IsTerminal},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result};
use beehive_api::CURL_TARGET;
use beehive_config::MainConfig;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LEVEL: &str = "warn";

/// Install the global subscriber: stderr always, plus a plain-text file
/// layer when `log.clilog.file` is configured.
pub fn init(main: Option<&MainConfig>) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(rust_log.as_deref(), main.and_then(|main| main.log_level.as_deref()));
    let filter = EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{directives}'"))?;

    let file_layer = match main.and_then(|main| main.log_file.as_deref()) {
        Some(path) => Some(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(open_log_file(path)?),
        ),
        None => None,
    };
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global subscriber is already installed")?;
    Ok(())
}

/// Filter string for the given sources.
pub fn filter_directives(rust_log: Option<&str>, config_level: Option<&str>) -> String {
    if let Some(rust_log) = rust_log.map(str::trim).filter(|value| !value.is_empty()) {
        return rust_log.to_string();
    }
    let level = config_level
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());
    format!("{level},{CURL_TARGET}=info")
}

fn open_log_file(path: &Path) -> Result<Arc<fs::File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok(Arc::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins_over_configuration() {
        assert_eq!(filter_directives(Some("debug"), Some("error")), "debug");
    }

    #[test]
    fn configured_level_keeps_curl_traces() {
        assert_eq!(filter_directives(None, Some(" INFO ")), "info,beehive::curl=info");
        assert_eq!(filter_directives(Some(""), None), "warn,beehive::curl=info");
    }

    #[test]
    fn log_file_directories_are_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/nested/cli.log");
        open_log_file(&path).expect("open");
        assert!(path.exists());
    }
}

//! Consistency checks for a built environment.

use beehive_types::Environment;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::ConfigError;

static LABEL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("label regex should compile"));

/// Validate endpoints and orchestrator labels of an environment.
pub fn validate_environment(environment: &Environment) -> Result<(), ConfigError> {
    for (subsystem, records) in &environment.endpoints {
        if records.is_empty() {
            return Err(ConfigError::invalid(
                format!("cmp.endpoints.{subsystem}"),
                "at least one endpoint is required",
            ));
        }
        for record in records {
            if record.hosts.is_empty() || record.hosts.iter().any(|host| host.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    format!("cmp.endpoints.{subsystem}"),
                    "every endpoint needs a non-empty host",
                ));
            }
        }
    }
    for (kind, labels) in &environment.orchestrators {
        for label in labels.keys() {
            validate_label(kind, label)?;
        }
    }
    debug!(environment = %environment.name, "validated environment");
    Ok(())
}

/// Orchestrator labels become CLI choices and must be plain words.
pub fn validate_label(kind: &str, label: &str) -> Result<(), ConfigError> {
    if !LABEL_REGEX.is_match(label) {
        return Err(ConfigError::invalid(
            format!("orchestrators.{kind}.{label}"),
            "labels may only contain letters, digits, dots, underscores and hyphens",
        ));
    }
    Ok(())
}

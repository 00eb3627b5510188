//! The `base` plugin: the root controller and the configuration browsers.

use beehive_config::{LoadedEnvironment, load_environment};
use beehive_registry::{
    BASE_LABEL, CommandContext, CommandDescriptor, Controller, ControllerDescriptor, ControllerRegistry, KernelError,
    ParseHints, Plugin, RegistryError,
};
use beehive_render::{BoolMap, ManagedData, RenderRequest, Section};
use beehive_types::{ArgumentSpec, OutputFormat};
use clap::{Command as ClapCommand, builder::PossibleValuesParser};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::app::{BIN_NAME, VERSION};

const ENVIRONMENTS_PATH: &str = "base.environments";

pub struct BasePlugin;

impl Plugin for BasePlugin {
    fn name(&self) -> &'static str {
        "base"
    }

    fn load(&self, registry: &mut ControllerRegistry) -> Result<(), RegistryError> {
        registry.register(VersionController)?;
        registry.register(EnvironmentsController)?;
        registry.register(OrchestratorsController)?;
        Ok(())
    }
}

/// The root of the command tree.
pub struct VersionController;

#[async_trait::async_trait]
impl Controller for VersionController {
    fn descriptor(&self) -> ControllerDescriptor {
        ControllerDescriptor::base("Beehive platform command line")
            .command(CommandDescriptor::new("version", "print the version").example("beehive3 version"))
    }

    async fn run(&self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        match command {
            "version" => ctx.message(format!("{BIN_NAME} {VERSION}")),
            other => Err(unknown_command(other)),
        }
    }
}

pub struct EnvironmentsController;

impl EnvironmentsController {
    fn list(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let config = ctx.services.config;
        let active = config.resolve_env_name(ctx.invocation.env.as_deref()).ok();
        let rows: Vec<Value> = config
            .environment_names()?
            .into_iter()
            .map(|name| json!({"active": active.as_deref() == Some(name.as_str()), "name": name}))
            .collect();
        ctx.render(
            RenderRequest::new(Value::Array(rows))
                .headers(["Name", "Active"])
                .fields(["name", "active"])
                .bool_map(BoolMap::new("*", "")),
        )
    }

    fn get(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let summary = match ctx.str("name") {
            Some(name) => {
                let main = ctx.services.config.main()?;
                describe(&load_environment(main, &name, ctx.invocation.vault.as_deref())?)
            }
            None => describe(ctx.environment()?),
        };
        ctx.render(RenderRequest::new(summary).details().manage_data(split_sections))
    }
}

#[async_trait::async_trait]
impl Controller for EnvironmentsController {
    fn descriptor(&self) -> ControllerDescriptor {
        ControllerDescriptor::new("environments", BASE_LABEL, "configured environments")
            .format(OutputFormat::Mixed)
            .command(CommandDescriptor::new("list", "list the environment files"))
            .command(
                CommandDescriptor::new("get", "show one environment")
                    .example("beehive3 environments get qa")
                    .arg(
                        ArgumentSpec::positional("name")
                            .required(false)
                            .help("environment name; the active one when omitted"),
                    ),
            )
    }

    async fn run(&self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        match command {
            "list" => self.list(ctx),
            "get" => self.get(ctx),
            other => Err(unknown_command(other)),
        }
    }
}

/// Labels configured under `orchestrators.<kind>`.
pub struct OrchestratorsController;

#[async_trait::async_trait]
impl Controller for OrchestratorsController {
    fn descriptor(&self) -> ControllerDescriptor {
        ControllerDescriptor::new("orchestrators", ENVIRONMENTS_PATH, "orchestrators of the active environment").command(
            CommandDescriptor::new("list", "list the orchestrators of one kind")
                .example("beehive3 environments orchestrators list k8s")
                .arg(ArgumentSpec::positional("kind").help("orchestrator kind")),
        )
    }

    /// Offer the configured kinds as choices for `list`.
    fn pre_argument_parsing(&self, command: ClapCommand, hints: &ParseHints<'_>) -> ClapCommand {
        if command.find_subcommand("list").is_none() {
            return command;
        }
        let kinds: Vec<String> = match hints.environment() {
            Ok(loaded) => loaded.environment.orchestrators.keys().cloned().collect(),
            Err(err) => {
                debug!(error = %err, "orchestrator kinds unavailable");
                return command;
            }
        };
        if kinds.is_empty() {
            return command;
        }
        command.mut_subcommand("list", |list| {
            list.mut_arg("kind", |arg| arg.value_parser(PossibleValuesParser::new(kinds)))
        })
    }

    async fn run(&self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        if command != "list" {
            return Err(unknown_command(command));
        }
        let kind = ctx.require_str("kind")?;
        let loaded = ctx.environment()?;
        let Some(labels) = loaded.environment.orchestrators.get(&kind) else {
            return Err(KernelError::manager(format!(
                "no '{kind}' orchestrators in environment '{}'",
                loaded.name()
            )));
        };
        let rows: Vec<Value> = labels
            .iter()
            .map(|(label, settings)| {
                let mut row = Map::new();
                row.insert("label".to_string(), Value::String(label.clone()));
                match settings {
                    Value::Object(settings) => row.extend(settings.clone()),
                    Value::Null => {}
                    other => {
                        row.insert("value".to_string(), other.clone());
                    }
                }
                Value::Object(row)
            })
            .collect();
        ctx.render(RenderRequest::new(Value::Array(rows)))
    }
}

fn unknown_command(command: &str) -> KernelError {
    KernelError::Usage(format!("unknown command '{command}'"))
}

/// Flat summary of an environment; endpoints and orchestrators become lists.
fn describe(loaded: &LoadedEnvironment) -> Value {
    let environment = &loaded.environment;
    let endpoints: Vec<Value> = environment
        .endpoints
        .iter()
        .flat_map(|(subsystem, records)| {
            records
                .iter()
                .flat_map(|record| record.base_urls())
                .map(move |url| json!({"subsystem": subsystem, "url": url}))
        })
        .collect();
    let orchestrators: Vec<Value> = environment
        .orchestrators
        .iter()
        .flat_map(|(kind, labels)| labels.keys().map(move |label| json!({"kind": kind, "label": label})))
        .collect();
    json!({
        "name": loaded.name(),
        "format": environment.format.map(|format| format.to_string()),
        "auth": environment.credentials.method,
        "curl": environment.curl,
        "task_uri": environment.task_uri,
        "files": loaded.sources.len(),
        "endpoints": endpoints,
        "orchestrators": orchestrators,
    })
}

fn split_sections(summary: &Value) -> ManagedData {
    let mut head = summary.clone();
    if let Value::Object(map) = &mut head {
        map.shift_remove("endpoints");
        map.shift_remove("orchestrators");
    }
    ManagedData {
        head,
        sections: vec![
            Section::new("Endpoints", summary["endpoints"].clone()).columns(["Subsystem", "Url"], ["subsystem", "url"]),
            Section::new("Orchestrators", summary["orchestrators"].clone()).columns(["Kind", "Label"], ["kind", "label"]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beehive_config::MainConfig;
    use std::fs;

    fn loaded() -> LoadedEnvironment {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("env")).expect("env dir");
        fs::write(
            dir.path().join("env/qa.yml"),
            "format: json\n\
             cmp:\n  endpoints:\n    resource: [\"http://r1:6060\", \"http://r2:6060\"]\n\
             orchestrators:\n  k8s:\n    east: {api: \"https://east\"}\n    west: null\n",
        )
        .expect("write");
        let main = MainConfig::from_document(&dir.path().join("beehive.yml"), json!({"beehive": {}})).expect("main");
        load_environment(&main, "qa", None).expect("load")
    }

    #[test]
    fn summary_lists_every_endpoint_url() {
        let summary = describe(&loaded());
        assert_eq!(summary["name"], "qa");
        assert_eq!(summary["format"], "json");
        assert_eq!(summary["auth"], "none");
        assert_eq!(summary["endpoints"].as_array().map(Vec::len), Some(2));
        assert_eq!(summary["orchestrators"][1], json!({"kind": "k8s", "label": "west"}));
    }

    #[test]
    fn sections_leave_a_scalar_head() {
        let managed = split_sections(&describe(&loaded()));
        assert!(managed.head.get("endpoints").is_none());
        assert_eq!(managed.sections.len(), 2);
        assert_eq!(managed.sections[0].fields, vec!["subsystem".to_string(), "url".to_string()]);
    }
}

//! Per-invocation state handed to controllers.
//!
//! The dispatcher builds an [`InvocationContext`] from the parsed global
//! flags, then a [`CommandContext`] around it for the selected command. Nothing
//! here is process-global: two invocations in one process do not share output
//! format, environment selection or platform client.

use std::sync::Arc;

use beehive_api::{ApiClient, TokenCache, TraceSettings};
use beehive_config::{ConfigStore, DEFAULT_PAGE_CAP, EnvSelection, LoadedEnvironment};
use beehive_render::{RenderOptions, RenderRegistry, RenderRequest, TemplateStore};
use beehive_types::{ArgumentKind, ArgumentSpec, OutputFormat, PageQuery, ValueType};
use beehive_util::{Console, PromptOutcome, StyleEngine};
use clap::ArgMatches;
use serde_json::{Value, json};
use tracing::debug;

use crate::{CommandDescriptor, ControllerKind, KernelError};

/// Global flags of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationContext {
    pub env: Option<String>,
    /// `--format`, when given.
    pub format: Option<OutputFormat>,
    /// Encryption key passed with `-k/--key`.
    pub key: Option<String>,
    pub vault: Option<String>,
    pub notruncate: bool,
    pub curl: bool,
    pub yes: bool,
    pub time: bool,
    pub fields: Vec<String>,
    pub afields: Vec<String>,
}

impl InvocationContext {
    /// Read the global group from the matches of the selected command.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, KernelError> {
        let format = string_of(matches, "format")
            .map(|raw| raw.parse::<OutputFormat>())
            .transpose()
            .map_err(|err| KernelError::Usage(err.to_string()))?;
        Ok(Self {
            env: string_of(matches, "env"),
            format,
            key: string_of(matches, "key"),
            vault: string_of(matches, "vault"),
            notruncate: flag_of(matches, "notruncate"),
            curl: flag_of(matches, "curl"),
            yes: flag_of(matches, "yes"),
            time: flag_of(matches, "time"),
            fields: strings_of(matches, "fields"),
            afields: strings_of(matches, "afields"),
        })
    }

    pub fn selection(&self) -> EnvSelection {
        EnvSelection {
            env: self.env.clone(),
            vault: self.vault.clone(),
        }
    }
}

/// Shared kernel components a command body works with.
pub struct KernelServices<'a> {
    pub config: &'a ConfigStore,
    pub renderer: &'a RenderRegistry,
    pub templates: Arc<TemplateStore>,
    pub tokens: Arc<TokenCache>,
    /// Platform client, set up by `pre_command_run` for platform controllers.
    pub api: Option<ApiClient>,
}

/// Everything a command body receives.
pub struct CommandContext<'a> {
    /// Dotted path of the controller owning the command.
    pub path: String,
    pub command: &'a CommandDescriptor,
    pub kind: &'a ControllerKind,
    /// The controller's default output format.
    pub controller_format: Option<OutputFormat>,
    pub invocation: InvocationContext,
    pub services: KernelServices<'a>,
    pub matches: &'a ArgMatches,
    pub console: &'a mut Console,
}

impl<'a> CommandContext<'a> {
    /// The active environment, loaded on first use.
    pub fn environment(&self) -> Result<&'a LoadedEnvironment, KernelError> {
        let config: &'a ConfigStore = self.services.config;
        Ok(config.environment(&self.invocation.selection())?)
    }

    /// Stand up a platform client for `subsystem` of the active environment.
    pub fn connect(&mut self, subsystem: &str) -> Result<(), KernelError> {
        let loaded = self.environment()?;
        let page_cap = self
            .services
            .config
            .main()
            .map(|main| main.page_cap)
            .unwrap_or(DEFAULT_PAGE_CAP);
        let trace = TraceSettings {
            curl: self.invocation.curl || loaded.environment.curl,
            curl_error: loaded.environment.curl_error,
        };
        let client = ApiClient::new(Arc::clone(&loaded.environment), subsystem)?
            .with_token_cache(Arc::clone(&self.services.tokens))
            .with_trace(trace)
            .with_page_cap(page_cap);
        debug!(subsystem, env = loaded.name(), "platform client ready");
        self.services.api = Some(client);
        Ok(())
    }

    /// Connect when the controller talks to the platform; otherwise nothing.
    pub fn connect_default(&mut self) -> Result<(), KernelError> {
        match self.kind {
            ControllerKind::Platform { subsystem, .. } => {
                let subsystem = subsystem.clone();
                self.connect(&subsystem)
            }
            _ => Ok(()),
        }
    }

    pub fn api(&self) -> Result<&ApiClient, KernelError> {
        self.services
            .api
            .as_ref()
            .ok_or_else(|| KernelError::manager(format!("'{}' has no platform client", self.path)))
    }

    /// Base URI of a platform controller, empty otherwise.
    pub fn base_uri(&self) -> &str {
        self.kind.base_uri().unwrap_or_default()
    }

    /// `--format`, then the controller default, then the loaded environment,
    /// then `beehive.default_format`, then `text`.
    pub fn format(&self) -> OutputFormat {
        self.invocation
            .format
            .or(self.controller_format)
            .or_else(|| self.services.config.loaded().and_then(|loaded| loaded.environment.format))
            .or_else(|| self.services.config.main().ok().and_then(|main| main.default_format))
            .unwrap_or_default()
    }

    /// Colour only for coloured formats, and only on a terminal unless the
    /// format was asked for explicitly.
    pub fn color(&self) -> bool {
        self.format().is_colored() && (self.console.is_interactive() || self.invocation.format.is_some())
    }

    pub fn style(&self) -> StyleEngine {
        StyleEngine::new(self.color())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            color: self.color(),
            notruncate: self.invocation.notruncate,
            fields: self.invocation.fields.clone(),
            afields: self.invocation.afields.clone(),
            templates: Arc::clone(&self.services.templates),
        }
    }

    pub fn render(&mut self, request: RenderRequest) -> Result<(), KernelError> {
        let format = self.format();
        let options = self.render_options();
        self.services.renderer.render(format, &request, &options, self.console.out())?;
        Ok(())
    }

    /// Render a one-line message.
    pub fn message(&mut self, text: impl Into<String>) -> Result<(), KernelError> {
        self.render(RenderRequest::message(text))
    }

    /// Ask for confirmation unless `-y` was given.
    pub fn confirm(&mut self, message: &str) -> Result<PromptOutcome, KernelError> {
        Ok(self.console.confirm_or_skip(self.invocation.yes, message)?)
    }

    /// Paging flags of a paginated command; defaults otherwise.
    pub fn page_query(&self) -> PageQuery {
        let defaults = PageQuery::default();
        PageQuery {
            size: int_of(self.matches, "size").unwrap_or(defaults.size),
            page: int_of(self.matches, "page").unwrap_or(defaults.page),
            field: string_of(self.matches, "field").unwrap_or(defaults.field),
            order: string_of(self.matches, "order").unwrap_or(defaults.order),
        }
    }

    fn spec(&self, dest: &str) -> Option<&'a ArgumentSpec> {
        let command: &'a CommandDescriptor = self.command;
        command.argument(dest)
    }

    /// Textual value of an argument; multi-word arguments are space-joined.
    pub fn str(&self, dest: &str) -> Option<String> {
        match self.value(dest)? {
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }

    /// Like [`CommandContext::str`], but a missing value is a usage error.
    pub fn require_str(&self, dest: &str) -> Result<String, KernelError> {
        self.str(dest)
            .ok_or_else(|| KernelError::Usage(format!("missing value for '{dest}'")))
    }

    pub fn int(&self, dest: &str) -> Option<i64> {
        self.value(dest)?.as_i64()
    }

    pub fn flag(&self, dest: &str) -> bool {
        self.value(dest).and_then(|value| value.as_bool()).unwrap_or(false)
    }

    /// Value of an argument as JSON, typed after its declaration.
    pub fn value(&self, dest: &str) -> Option<Value> {
        let spec = self.spec(dest)?;
        let matches = self.matches;
        match spec.kind {
            ArgumentKind::StoreTrue => Some(Value::Bool(flag_of(matches, dest))),
            ArgumentKind::Count => {
                let count = matches.try_get_one::<u8>(dest).ok().flatten().copied().unwrap_or(0);
                Some(json!(count))
            }
            ArgumentKind::StringJoin => {
                let words = strings_of(matches, dest);
                (!words.is_empty()).then(|| Value::String(words.join(" ")))
            }
            ArgumentKind::Store => match spec.value_type {
                ValueType::String => string_of(matches, dest).map(Value::String),
                ValueType::Int => int_of(matches, dest).map(|n| json!(n)),
                ValueType::Float => matches.try_get_one::<f64>(dest).ok().flatten().map(|n| json!(n)),
                ValueType::Bool => matches.try_get_one::<bool>(dest).ok().flatten().map(|b| json!(b)),
            },
        }
    }
}

fn string_of(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

fn strings_of(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .try_get_many::<String>(id)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn int_of(matches: &ArgMatches, id: &str) -> Option<i64> {
    matches.try_get_one::<i64>(id).ok().flatten().copied()
}

fn flag_of(matches: &ArgMatches, id: &str) -> bool {
    matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false)
}

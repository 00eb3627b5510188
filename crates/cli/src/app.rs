//! The dispatcher: plugins in, one command out.

use std::{
    future::Future,
    io::Write,
    sync::Arc,
    time::{Duration, Instant},
};

use beehive_api::TokenCache;
use beehive_config::{ConfigError, ConfigStore, EnvSelection};
use beehive_registry::{
    CommandContext, ControllerRegistry, Dispatch, InvocationContext, KernelError, KernelServices, ParseHints, Plugin,
    PluginLoader, RegistryError, build_parser, dispatch_target, normalize_legacy_args,
};
use beehive_render::{RenderRegistry, TemplateStore};
use beehive_util::Console;
use clap::{Command as ClapCommand, error::ErrorKind};
use tracing::{debug, error, info};

use crate::plugins::builtin_plugins;

pub const BIN_NAME: &str = "beehive3";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One command line run against the compiled-in plugins.
pub struct App {
    plugins: Vec<Box<dyn Plugin>>,
    config: ConfigStore,
    renderer: RenderRegistry,
    tokens: Arc<TokenCache>,
    console: Console,
}

impl App {
    pub fn new(config: ConfigStore, console: Console) -> Self {
        Self::with_plugins(config, console, builtin_plugins())
    }

    pub fn with_plugins(config: ConfigStore, console: Console, plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self {
            plugins,
            config,
            renderer: RenderRegistry::new(),
            tokens: Arc::new(TokenCache::new()),
            console,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Parse `argv` (program name first) and run the selected command.
    pub async fn run<I, S>(&mut self, argv: I) -> Result<(), KernelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let (registry, templates) = self.load_plugins()?;

        let full = build_parser(&registry, BIN_NAME, None);
        let argv = normalize_legacy_args(&full, argv);
        let target = registry.resolve_prefix(&positional_prefix(&full, &argv));
        let registry = registry.prune(&target)?;
        debug!(target = %target, controllers = registry.len(), "registry pruned");

        let selection = selection_hint(&argv);
        let hints = ParseHints {
            config: &self.config,
            selection: &selection,
        };
        let mut parser = build_parser(&registry, BIN_NAME, Some(&hints)).version(VERSION);
        let matches = match parser.try_get_matches_from_mut(argv.clone()) {
            Ok(matches) => matches,
            Err(err) => return self.parse_failure(err),
        };

        let (controller_path, command_label, leaf) = match dispatch_target(&matches) {
            Dispatch::Command {
                controller,
                command,
                matches,
            } => (controller, command, matches),
            Dispatch::Namespace { tokens } => {
                let help = namespace_help(&mut parser, &tokens)?;
                write!(self.console.out(), "{help}")?;
                return Ok(());
            }
        };
        let registered = registry
            .get(&controller_path)
            .ok_or_else(|| RegistryError::UnknownController(controller_path.clone()))?;
        let command = registered
            .descriptor
            .find_command(&command_label)
            .ok_or_else(|| KernelError::Usage(format!("unknown command '{command_label}'")))?;
        let controller = Arc::clone(&registered.controller);
        for entry in registry.iter() {
            entry.controller.post_argument_parsing(leaf)?;
        }

        let invocation = InvocationContext::from_matches(leaf)?;
        let show_time = invocation.time;
        let mut ctx = CommandContext {
            path: controller_path.clone(),
            command,
            kind: &registered.descriptor.kind,
            controller_format: registered.descriptor.format,
            invocation,
            services: KernelServices {
                config: &self.config,
                renderer: &self.renderer,
                templates: Arc::new(templates),
                tokens: Arc::clone(&self.tokens),
                api: None,
            },
            matches: leaf,
            console: &mut self.console,
        };
        info!(controller = %controller_path, command = %command_label, "dispatching");

        let started = Instant::now();
        controller.pre_command_run(&mut ctx).await?;
        let pre_command = started.elapsed();

        let started = Instant::now();
        let outcome = match controller.run(&command_label, &mut ctx).await {
            Ok(()) => controller.post_command_run(&mut ctx).await,
            Err(err) => Err(err),
        };
        let command_time = started.elapsed();
        if show_time {
            write_timing(ctx.console.err(), pre_command, command_time)?;
        }
        outcome
    }

    /// Run until `cancel` resolves; a cancelled run is [`KernelError::Cancelled`].
    pub async fn run_until<I, S, F>(&mut self, argv: I, cancel: F) -> Result<(), KernelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Future<Output = ()>,
    {
        tokio::select! {
            outcome = self.run(argv) => outcome,
            () = cancel => {
                info!("interrupted");
                Err(KernelError::Cancelled)
            }
        }
    }

    pub fn exit_code(outcome: &Result<(), KernelError>) -> i32 {
        match outcome {
            Ok(()) => 0,
            Err(err) => err.exit_code(),
        }
    }

    /// Print the diagnostic for a failed run on the error stream.
    pub fn report(&mut self, err: &KernelError) {
        let line = match err {
            KernelError::Cancelled => "cancelled".to_string(),
            KernelError::Internal(inner) => {
                error!(error = ?inner, "unexpected failure");
                format!("error: {}: {inner:#}", err.category())
            }
            other => format!("error: {}: {other}", other.category()),
        };
        // Nothing sensible remains once stderr itself fails.
        let _ = writeln!(self.console.err(), "{line}");
    }

    fn load_plugins(&self) -> Result<(ControllerRegistry, TemplateStore), KernelError> {
        let loader = match self.config.main() {
            Ok(main) => PluginLoader::new(&main.plugin_path),
            Err(ConfigError::NotFound { path }) => {
                debug!(path = %path.display(), "no main configuration; plugins use defaults");
                PluginLoader::without_directory()
            }
            Err(err) => return Err(err.into()),
        };
        let mut registry = ControllerRegistry::new();
        let mut templates = TemplateStore::new();
        let loaded = loader.load(&self.plugins, &mut registry, &mut templates)?;
        registry.validate()?;
        debug!(plugins = loaded.len(), templates = templates.len(), "plugins loaded");
        Ok((registry, templates))
    }

    fn parse_failure(&mut self, err: clap::Error) -> Result<(), KernelError> {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                write!(self.console.out(), "{}", err.render())?;
                Ok(())
            }
            _ => {
                let rendered = err.render().to_string();
                let message = rendered.trim().strip_prefix("error: ").unwrap_or(rendered.trim());
                Err(KernelError::Usage(message.to_string()))
            }
        }
    }
}

fn write_timing(err: &mut dyn Write, pre_command: Duration, command: Duration) -> std::io::Result<()> {
    writeln!(
        err,
        "execution time: pre-command {:.3}s, command {:.3}s",
        pre_command.as_secs_f64(),
        command.as_secs_f64()
    )
}

/// Leading tokens that can only be namespace or command names.
///
/// Global options may appear anywhere, so they and their values are skipped;
/// any other option ends the prefix.
fn positional_prefix<'a>(root: &ClapCommand, argv: &'a [String]) -> Vec<&'a str> {
    let mut prefix = Vec::new();
    let mut tokens = argv.iter().skip(1).map(String::as_str);
    while let Some(token) = tokens.next() {
        if !token.starts_with('-') {
            prefix.push(token);
            continue;
        }
        match global_option(root, token) {
            Some(GlobalOption::NeedsValue) => {
                tokens.next();
            }
            Some(GlobalOption::Complete) => {}
            None => break,
        }
    }
    prefix
}

enum GlobalOption {
    /// The value is the next token.
    NeedsValue,
    /// A switch, or an option with its value attached.
    Complete,
}

fn global_option(root: &ClapCommand, token: &str) -> Option<GlobalOption> {
    let (arg, attached) = if let Some(long) = token.strip_prefix("--") {
        let (name, value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        (root.get_arguments().find(|arg| arg.get_long() == Some(name))?, value)
    } else {
        let mut chars = token.strip_prefix('-')?.chars();
        let short = chars.next()?;
        let arg = root.get_arguments().find(|arg| arg.get_short() == Some(short))?;
        (arg, chars.next().is_some())
    };
    if !arg.is_global_set() {
        return None;
    }
    if arg.get_action().takes_values() && !attached {
        Some(GlobalOption::NeedsValue)
    } else {
        Some(GlobalOption::Complete)
    }
}

/// `--env`/`--vault` as typed, for hooks that run before parsing.
fn selection_hint(argv: &[String]) -> EnvSelection {
    let mut selection = EnvSelection::default();
    let mut tokens = argv.iter().skip(1);
    while let Some(token) = tokens.next() {
        if token == "--" {
            break;
        }
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (token.as_str(), None),
        };
        let slot = match name {
            "-e" | "--env" => &mut selection.env,
            "--vault" => &mut selection.vault,
            _ => continue,
        };
        *slot = inline.or_else(|| tokens.next().cloned());
    }
    selection
}

fn namespace_help(parser: &mut ClapCommand, tokens: &[String]) -> Result<String, KernelError> {
    let mut node = parser;
    for token in tokens {
        node = match node.find_subcommand_mut(token) {
            Some(sub) => sub,
            None => return Err(KernelError::Usage(format!("unknown namespace '{}'", tokens.join(" ")))),
        };
    }
    Ok(node.render_help().to_string())
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, sync::Mutex};

    use super::*;
    use beehive_registry::{BASE_LABEL, CommandDescriptor, Controller, ControllerDescriptor};
    use beehive_util::SharedBuffer;
    use clap::ArgMatches;

    use crate::plugins::BasePlugin;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|token| token.to_string()).collect()
    }

    fn root() -> ClapCommand {
        build_parser(&ControllerRegistry::new(), BIN_NAME, None)
    }

    #[test]
    fn positional_prefix_skips_global_options() {
        let root = root();
        let tokens = argv(&["beehive3", "environments", "get", "-f", "json", "dev"]);
        assert_eq!(positional_prefix(&root, &tokens), vec!["environments", "get", "dev"]);

        let tokens = argv(&["beehive3", "-f", "json", "--curl", "--env=qa", "environments", "orchestrators", "list"]);
        assert_eq!(positional_prefix(&root, &tokens), vec!["environments", "orchestrators", "list"]);

        let tokens = argv(&["beehive3", "-fjson", "environments", "list"]);
        assert_eq!(positional_prefix(&root, &tokens), vec!["environments", "list"]);
    }

    #[test]
    fn positional_prefix_stops_at_command_options() {
        let tokens = argv(&["beehive3", "get", "--id", "42"]);
        assert_eq!(positional_prefix(&root(), &tokens), vec!["get"]);
    }

    #[test]
    fn selection_hint_reads_both_spellings() {
        let hint = selection_hint(&argv(&["beehive3", "orchestrators", "list", "-e", "qa", "--vault=/tmp/v.yml"]));
        assert_eq!(hint.env.as_deref(), Some("qa"));
        assert_eq!(hint.vault.as_deref(), Some("/tmp/v.yml"));

        let hint = selection_hint(&argv(&["beehive3", "--", "--env", "prod"]));
        assert_eq!(hint, EnvSelection::default());
    }

    #[test]
    fn timing_line_has_two_phases() {
        let mut out = Vec::new();
        write_timing(&mut out, Duration::from_millis(1500), Duration::from_millis(250)).expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "execution time: pre-command 1.500s, command 0.250s\n"
        );
    }

    struct Watcher {
        label: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Controller for Watcher {
        fn descriptor(&self) -> ControllerDescriptor {
            ControllerDescriptor::new(self.label, BASE_LABEL, "watches parsing")
                .command(CommandDescriptor::new("noop", "does nothing"))
        }

        fn post_argument_parsing(&self, matches: &ArgMatches) -> Result<(), KernelError> {
            let format = matches.get_one::<String>("format").cloned().unwrap_or_default();
            self.seen.lock().expect("seen").push(format!("{}:{format}", self.label));
            Ok(())
        }

        async fn run(&self, _command: &str, _ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
            Ok(())
        }
    }

    struct WatchersPlugin(Arc<Mutex<Vec<String>>>);

    impl Plugin for WatchersPlugin {
        fn name(&self) -> &'static str {
            "watchers"
        }

        fn load(&self, registry: &mut ControllerRegistry) -> Result<(), RegistryError> {
            for label in ["alpha", "beta"] {
                registry.register(Watcher {
                    label,
                    seen: Arc::clone(&self.0),
                })?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_retained_controller_sees_the_parsed_arguments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let main = dir.path().join("beehive.yml");
        std::fs::write(&main, "beehive:\n  default_env: dev\n").expect("main file");
        let out = SharedBuffer::new();
        let console = Console::new(
            Box::new(Cursor::new(Vec::new())),
            Box::new(out.clone()),
            Box::new(SharedBuffer::new()),
            false,
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(BasePlugin), Box::new(WatchersPlugin(Arc::clone(&seen)))];
        let mut app = App::with_plugins(ConfigStore::new(main), console, plugins);

        let outcome = app.run(["beehive3", "version", "-f", "json"]).await;
        assert!(outcome.is_ok(), "{outcome:?}");
        let mut seen = seen.lock().expect("seen").clone();
        seen.sort();
        assert_eq!(seen, vec!["alpha:json".to_string(), "beta:json".to_string()]);
    }

    #[test]
    fn exit_codes_follow_the_error_kind() {
        assert_eq!(App::exit_code(&Ok(())), 0);
        assert_eq!(App::exit_code(&Err(KernelError::Cancelled)), 0);
        assert_eq!(App::exit_code(&Err(KernelError::Usage("bad".into()))), 1);
        assert_eq!(App::exit_code(&Err(KernelError::Internal(anyhow::anyhow!("boom")))), 255);
    }
}

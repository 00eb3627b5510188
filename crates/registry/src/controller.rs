use beehive_config::{ConfigError, ConfigStore, EnvSelection, LoadedEnvironment};
use clap::{ArgMatches, Command as ClapCommand};

use crate::{CommandContext, ControllerDescriptor, KernelError};

/// What a controller may consult before arguments are parsed.
#[derive(Debug, Clone, Copy)]
pub struct ParseHints<'a> {
    pub config: &'a ConfigStore,
    /// `--env`/`--vault` as they appear in the raw arguments.
    pub selection: &'a EnvSelection,
}

impl<'a> ParseHints<'a> {
    pub fn environment(&self) -> Result<&'a LoadedEnvironment, ConfigError> {
        self.config.environment(self.selection)
    }
}

/// A named group of commands.
///
/// The dispatcher calls, in order: [`Controller::pre_argument_parsing`] while
/// the parser is built, [`Controller::post_argument_parsing`] once arguments
/// are parsed, then [`Controller::pre_command_run`], [`Controller::run`] and
/// [`Controller::post_command_run`] for the selected command.
#[async_trait::async_trait]
pub trait Controller: Send + Sync {
    /// Static description; read once, at registration.
    fn descriptor(&self) -> ControllerDescriptor;

    /// Adjust the parser node holding this controller's commands, e.g. to
    /// offer choices taken from configuration.
    fn pre_argument_parsing(&self, command: ClapCommand, _hints: &ParseHints<'_>) -> ClapCommand {
        command
    }

    fn post_argument_parsing(&self, _matches: &ArgMatches) -> Result<(), KernelError> {
        Ok(())
    }

    /// Platform controllers get their `ApiClient` here.
    async fn pre_command_run(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        ctx.connect_default()
    }

    /// Execute `command`, one of the labels of the descriptor.
    async fn run(&self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), KernelError>;

    async fn post_command_run(&self, _ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        Ok(())
    }
}

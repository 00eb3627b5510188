//! Builds the `clap` command tree from the controller registry.

use std::collections::HashSet;

use beehive_types::{ArgumentKind, ArgumentSpec, OutputFormat, ValueType};
use clap::{
    Arg, ArgAction, ArgMatches, Command as ClapCommand,
    builder::{BoolishValueParser, PossibleValuesParser},
    value_parser,
};

use crate::{
    ArgumentFormatter, CommandDescriptor, ControllerRegistry, DISPATCH_ARGUMENT, ParseHints, RegisteredController,
    Stacking,
};

/// Help heading of the flags every command accepts.
pub const GLOBAL_HEADING: &str = "global";
const PAGING_HEADING: &str = "paging";

/// Builds the complete parser for `registry`.
///
/// Nested controllers become subcommands named after their label; the commands
/// of a controller are attached to the node of its namespace, so embedded
/// controllers contribute commands to their parent's node. Each command
/// carries a hidden `--__dispatch__` argument whose default names the
/// controller and the command, which is how the dispatcher finds its way back
/// from the matches.
///
/// When `hints` is given, every controller's `pre_argument_parsing` hook runs
/// on the node holding its commands.
///
/// # Examples
///
/// ```rust,ignore
/// let parser = build_parser(&registry, "beehive3", None);
/// let matches = parser.try_get_matches_from(["beehive3", "environments", "list"])?;
/// ```
pub fn build_parser(registry: &ControllerRegistry, bin_name: &str, hints: Option<&ParseHints<'_>>) -> ClapCommand {
    let about = registry
        .get(crate::BASE_LABEL)
        .map(|base| base.descriptor.help.clone())
        .unwrap_or_default();
    let root = create_root_command(bin_name).about(about);
    build_namespace(registry, &[], root, hints)
}

/// Root command with the `global` group.
fn create_root_command(bin_name: &str) -> ClapCommand {
    let flag = |id: &'static str, help: &'static str| {
        Arg::new(id)
            .long(id)
            .help(help)
            .global(true)
            .help_heading(GLOBAL_HEADING)
            .action(ArgAction::SetTrue)
    };
    let value = |id: &'static str, help: &'static str| {
        Arg::new(id)
            .long(id)
            .help(help)
            .global(true)
            .help_heading(GLOBAL_HEADING)
            .action(ArgAction::Set)
    };
    ClapCommand::new(bin_name.to_string())
        .arg(flag("yes", "Answer yes to confirmation prompts").short('y'))
        .arg(value("env", "Environment to work with").short('e'))
        .arg(
            value("format", "Output format")
                .short('f')
                .value_parser(PossibleValuesParser::new(OutputFormat::NAMES)),
        )
        .arg(value("key", "Encryption key").short('k'))
        .arg(value("vault", "Vault file with secrets"))
        .arg(flag("notruncate", "Do not truncate long values"))
        .arg(flag("curl", "Log an equivalent curl command for each request"))
        .arg(flag("time", "Print the execution time on stderr"))
        .arg(
            value("fields", "Comma separated fields to show instead of the defaults")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            value("afields", "Comma separated fields to show besides the defaults")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
}

fn owns_namespace(registry: &ControllerRegistry, entry: &RegisteredController, namespace: &[String]) -> bool {
    registry.namespace(&entry.path).is_some_and(|ns| ns == namespace)
}

fn build_namespace(
    registry: &ControllerRegistry,
    namespace: &[String],
    mut node: ClapCommand,
    hints: Option<&ParseHints<'_>>,
) -> ClapCommand {
    let members: Vec<&RegisteredController> = registry
        .iter()
        .filter(|entry| owns_namespace(registry, entry, namespace))
        .collect();

    for entry in &members {
        for command in &entry.descriptor.commands {
            node = node.subcommand(build_subcommand(&entry.path, entry.descriptor.formatter, command));
        }
    }

    for entry in registry.iter() {
        let Some(child_ns) = registry.namespace(&entry.path) else {
            continue;
        };
        let is_child = entry.descriptor.stacking == Stacking::Nested
            && child_ns.len() == namespace.len() + 1
            && child_ns.starts_with(namespace);
        if !is_child {
            continue;
        }
        node = node.subcommand(build_namespace(registry, &child_ns, build_group_command(entry), hints));
    }

    if let Some(hints) = hints {
        for entry in members {
            node = entry.controller.pre_argument_parsing(node, hints);
        }
    }
    node
}

/// Node of a nested controller; its commands and children are added by the caller.
fn build_group_command(entry: &RegisteredController) -> ClapCommand {
    let descriptor = &entry.descriptor;
    let mut group = ClapCommand::new(descriptor.label.clone()).about(descriptor.formatter.format(&descriptor.help));
    if let Some(description) = &descriptor.description {
        group = group.long_about(descriptor.formatter.format(description));
    }
    group
}

/// One command with its arguments, optional paging flags and the hidden
/// dispatch target `<controller path>.<label>`.
fn build_subcommand(controller_path: &str, formatter: ArgumentFormatter, command: &CommandDescriptor) -> ClapCommand {
    let mut subcommand = ClapCommand::new(command.label.clone()).about(formatter.format(&command.help));
    if let Some(description) = &command.description {
        subcommand = subcommand.long_about(formatter.format(description));
    }
    if let Some(example) = &command.example {
        subcommand = subcommand.after_help(format!("Example: {example}"));
    }

    let mut position = 1;
    for spec in &command.arguments {
        let mut arg = build_argument(spec, formatter);
        if spec.is_positional() {
            arg = arg.index(position);
            position += 1;
        }
        subcommand = subcommand.arg(arg);
    }

    if command.paginated {
        subcommand = add_paging_arguments(subcommand);
    }

    subcommand.arg(
        Arg::new(DISPATCH_ARGUMENT)
            .long(DISPATCH_ARGUMENT)
            .hide(true)
            .action(ArgAction::Set)
            .default_value(format!("{controller_path}.{}", command.label)),
    )
}

/// `--size` (negative values select the bulk modes), `--page`, `--field`, `--order`.
fn add_paging_arguments(subcommand: ClapCommand) -> ClapCommand {
    subcommand
        .arg(
            Arg::new("size")
                .long("size")
                .help("Page size; -1 for everything at once, below -1 to fetch every page")
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true)
                .default_value("20")
                .help_heading(PAGING_HEADING),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .help("Page number")
                .value_parser(value_parser!(i64))
                .default_value("0")
                .help_heading(PAGING_HEADING),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .help("Sort field")
                .default_value("id")
                .help_heading(PAGING_HEADING),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .help("Sort order")
                .value_parser(PossibleValuesParser::new(["ASC", "DESC", "asc", "desc"]))
                .default_value("DESC")
                .help_heading(PAGING_HEADING),
        )
}

/// Translate one [`ArgumentSpec`] into a clap argument.
///
/// Options get their long and short spellings; the caller assigns indices to
/// positionals. `StringJoin` arguments take one or more words that the
/// command context later joins with single spaces.
fn build_argument(spec: &ArgumentSpec, formatter: ArgumentFormatter) -> Arg {
    let mut arg = Arg::new(spec.dest.clone()).required(spec.required);
    if let Some(long) = &spec.long {
        arg = arg.long(long.clone());
    }
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }

    arg = match spec.kind {
        ArgumentKind::StoreTrue => arg.action(ArgAction::SetTrue),
        ArgumentKind::Count => arg.action(ArgAction::Count),
        ArgumentKind::StringJoin => arg.action(ArgAction::Set).num_args(1..),
        ArgumentKind::Store => add_value_parser(arg.action(ArgAction::Set), spec),
    };

    if matches!(spec.kind, ArgumentKind::Store | ArgumentKind::StringJoin) {
        arg = add_default_value(arg, spec);
    }
    arg.help(generate_help_text(spec, formatter))
}

fn add_value_parser(arg: Arg, spec: &ArgumentSpec) -> Arg {
    match spec.value_type {
        ValueType::String if !spec.choices.is_empty() => arg.value_parser(PossibleValuesParser::new(spec.choices.clone())),
        ValueType::String => arg,
        ValueType::Int => arg.value_parser(value_parser!(i64)).allow_negative_numbers(true),
        ValueType::Float => arg.value_parser(value_parser!(f64)).allow_negative_numbers(true),
        ValueType::Bool => arg.value_parser(BoolishValueParser::new()),
    }
}

fn add_default_value(arg: Arg, spec: &ArgumentSpec) -> Arg {
    match &spec.default {
        Some(default) => arg.default_value(default.clone()),
        None => arg,
    }
}

fn generate_help_text(spec: &ArgumentSpec, formatter: ArgumentFormatter) -> String {
    match &spec.help {
        Some(help) => formatter.format(help),
        None => spec.dest.clone(),
    }
}

/// What the parsed arguments select.
#[derive(Debug)]
pub enum Dispatch<'m> {
    /// A command, with the matches of its own node.
    Command {
        controller: String,
        command: String,
        matches: &'m ArgMatches,
    },
    /// A namespace without a command; the tokens name it.
    Namespace { tokens: Vec<String> },
}

/// Follow the subcommand chain to the node the user selected.
pub fn dispatch_target(matches: &ArgMatches) -> Dispatch<'_> {
    let mut current = matches;
    let mut tokens = Vec::new();
    while let Some((name, sub)) = current.subcommand() {
        tokens.push(name.to_string());
        current = sub;
    }
    let target = current.try_get_one::<String>(DISPATCH_ARGUMENT).ok().flatten();
    match target.and_then(|target| target.rsplit_once('.')) {
        Some((controller, command)) => Dispatch::Command {
            controller: controller.to_string(),
            command: command.to_string(),
            matches: current,
        },
        None => Dispatch::Namespace { tokens },
    }
}

/// Rewrite legacy single-dash long options (`-size 3`) to `--size 3`.
///
/// Only names that are long options of the root or of a subcommand on the
/// selected path are rewritten; short flags, bundles and negative numbers pass
/// through untouched, as does everything after `--`.
pub fn normalize_legacy_args(parser: &ClapCommand, argv: Vec<String>) -> Vec<String> {
    let mut longs: HashSet<String> = long_names(parser);
    let mut node = parser;
    for token in argv.iter().skip(1) {
        if token == "--" {
            break;
        }
        if token.starts_with('-') {
            continue;
        }
        if let Some(sub) = node.find_subcommand(token) {
            node = sub;
            longs.extend(long_names(node));
        }
    }

    let mut passthrough = false;
    argv.into_iter()
        .enumerate()
        .map(|(index, token)| {
            if token == "--" {
                passthrough = true;
            }
            if index == 0 || passthrough || !is_legacy_long(&token, &longs) {
                token
            } else {
                format!("-{token}")
            }
        })
        .collect()
}

fn long_names(command: &ClapCommand) -> HashSet<String> {
    command
        .get_arguments()
        .filter_map(|arg| arg.get_long())
        .map(str::to_string)
        .collect()
}

fn is_legacy_long(token: &str, longs: &HashSet<String>) -> bool {
    let Some(rest) = token.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') || rest.len() < 2 || !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return false;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    longs.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControllerDescriptor, test_support::StubController};
    use beehive_types::ArgumentSpec;

    fn registry() -> ControllerRegistry {
        let mut registry = ControllerRegistry::new();
        let descriptors = [
            ControllerDescriptor::base("Platform command line"),
            ControllerDescriptor::new("entities", "base", "entities")
                .embedded()
                .command(
                    CommandDescriptor::new("get", "get one entity")
                        .arg(ArgumentSpec::option("id").short('i').value_type(ValueType::Int).required(true)),
                )
                .command(CommandDescriptor::new("list", "list entities").paginated())
                .command(
                    CommandDescriptor::new("note", "attach a note")
                        .arg(ArgumentSpec::positional("id"))
                        .arg(ArgumentSpec::positional("text").kind(ArgumentKind::StringJoin))
                        .example("beehive3 note 7 remember the milk"),
                ),
            ControllerDescriptor::new("environments", "base", "configured environments")
                .command(CommandDescriptor::new("list", "list environments")),
        ];
        for descriptor in descriptors {
            registry.register(StubController::new(descriptor)).expect("register");
        }
        registry
    }

    fn parse(argv: &[&str]) -> ArgMatches {
        build_parser(&registry(), "beehive3", None)
            .try_get_matches_from(argv)
            .expect("parse")
    }

    #[test]
    fn dispatch_names_controller_and_command() {
        let matches = parse(&["beehive3", "get", "--id", "42"]);
        let Dispatch::Command {
            controller,
            command,
            matches,
        } = dispatch_target(&matches)
        else {
            panic!("expected a command");
        };
        assert_eq!(controller, "base.entities");
        assert_eq!(command, "get");
        assert_eq!(matches.get_one::<i64>("id"), Some(&42));

        let matches = parse(&["beehive3", "environments", "list"]);
        assert!(matches!(
            dispatch_target(&matches),
            Dispatch::Command { controller, .. } if controller == "base.environments"
        ));
    }

    #[test]
    fn bare_namespaces_dispatch_to_help() {
        let matches = parse(&["beehive3", "environments"]);
        assert!(matches!(
            dispatch_target(&matches),
            Dispatch::Namespace { tokens } if tokens == vec!["environments".to_string()]
        ));
    }

    #[test]
    fn string_join_collects_words() {
        let matches = parse(&["beehive3", "note", "7", "remember", "the", "milk"]);
        let Dispatch::Command { matches, .. } = dispatch_target(&matches) else {
            panic!("expected a command");
        };
        let words: Vec<&String> = matches.get_many::<String>("text").expect("text").collect();
        assert_eq!(words, ["remember", "the", "milk"]);
    }

    #[test]
    fn help_lists_label_flags_and_example() {
        let err = build_parser(&registry(), "beehive3", None)
            .try_get_matches_from(["beehive3", "note", "--help"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let help = err.to_string();
        assert!(help.contains("note"));
        assert!(help.contains("Example: beehive3 note 7 remember the milk"));
        for flag in ["--yes", "--env", "--format", "--key", "--vault", "--notruncate", "--curl"] {
            assert!(help.contains(flag), "{flag} missing from:\n{help}");
        }
        assert!(!help.contains(DISPATCH_ARGUMENT));
    }

    #[test]
    fn paging_flags_accept_negative_sizes() {
        let parser = build_parser(&registry(), "beehive3", None);
        let argv = normalize_legacy_args(
            &parser,
            ["beehive3", "list", "-size", "-2", "-order", "ASC"].map(String::from).to_vec(),
        );
        assert_eq!(argv, ["beehive3", "list", "--size", "-2", "--order", "ASC"]);
        let matches = parser.try_get_matches_from(argv).expect("parse");
        let Dispatch::Command { matches, .. } = dispatch_target(&matches) else {
            panic!("expected a command");
        };
        assert_eq!(matches.get_one::<i64>("size"), Some(&-2));
        assert_eq!(matches.get_one::<String>("field").map(String::as_str), Some("id"));
    }

    #[test]
    fn legacy_normalization_leaves_shorts_alone() {
        let parser = build_parser(&registry(), "beehive3", None);
        let argv = ["beehive3", "get", "-id", "42", "-y", "-f", "json", "--", "-id"].map(String::from).to_vec();
        assert_eq!(
            normalize_legacy_args(&parser, argv),
            ["beehive3", "get", "--id", "42", "-y", "-f", "json", "--", "-id"]
        );
    }

    #[test]
    fn unknown_formats_are_usage_errors() {
        let err = build_parser(&registry(), "beehive3", None)
            .try_get_matches_from(["beehive3", "list", "-f", "xml"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}

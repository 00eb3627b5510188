//! Static descriptions of controllers and their commands.

use beehive_types::{ArgumentSpec, OutputFormat};

/// Label and path of the root controller.
pub const BASE_LABEL: &str = "base";

/// Flags every command carries through the `global` group.
pub const GLOBAL_ARGUMENTS: [&str; 10] = [
    "yes", "env", "format", "key", "vault", "notruncate", "curl", "time", "fields", "afields",
];

/// Flags added to paginated commands.
pub const PAGING_ARGUMENTS: [&str; 4] = ["size", "page", "field", "order"];

/// Hidden argument naming the dispatch target of a parsed command.
pub const DISPATCH_ARGUMENT: &str = "__dispatch__";

/// Where a controller's commands live in the command tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stacking {
    /// Under a namespace of its own, named after the label.
    #[default]
    Nested,
    /// Directly in the parent's namespace.
    Embedded,
}

/// How help text of a controller is laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArgumentFormatter {
    /// Descriptions and examples verbatim.
    #[default]
    Raw,
    /// Runs of whitespace collapsed into single spaces.
    Collapse,
}

impl ArgumentFormatter {
    pub fn format(&self, text: &str) -> String {
        match self {
            Self::Raw => text.to_string(),
            Self::Collapse => text.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Default endpoint configuration of a controller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ControllerKind {
    /// The root controller.
    Base,
    /// Talks to one platform subsystem; gets an `ApiClient` before each command.
    Platform { subsystem: String, base_uri: String },
    /// Talks to a federated orchestrator of the given kind.
    Orchestrator { kind: String },
    /// Needs neither the platform nor an orchestrator.
    #[default]
    Local,
}

impl ControllerKind {
    pub fn platform(subsystem: impl Into<String>, base_uri: impl Into<String>) -> Self {
        Self::Platform {
            subsystem: subsystem.into(),
            base_uri: base_uri.into(),
        }
    }

    pub fn subsystem(&self) -> Option<&str> {
        match self {
            Self::Platform { subsystem, .. } => Some(subsystem),
            _ => None,
        }
    }

    pub fn base_uri(&self) -> Option<&str> {
        match self {
            Self::Platform { base_uri, .. } => Some(base_uri),
            _ => None,
        }
    }
}

/// One verb of a controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandDescriptor {
    pub label: String,
    pub help: String,
    pub description: Option<String>,
    pub example: Option<String>,
    pub arguments: Vec<ArgumentSpec>,
    /// Adds `--size`, `--page`, `--field` and `--order`.
    pub paginated: bool,
}

impl CommandDescriptor {
    pub fn new(label: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            help: help.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn arg(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn paginated(mut self) -> Self {
        self.paginated = true;
        self
    }

    pub fn argument(&self, dest: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|argument| argument.dest == dest)
    }
}

/// A logical group of commands and where it hangs in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerDescriptor {
    pub label: String,
    /// Dotted path of the parent controller; empty only for `base`.
    pub parent: String,
    pub help: String,
    pub description: Option<String>,
    /// Output format used when `--format` is not given.
    pub format: Option<OutputFormat>,
    pub kind: ControllerKind,
    pub stacking: Stacking,
    pub formatter: ArgumentFormatter,
    pub commands: Vec<CommandDescriptor>,
}

impl ControllerDescriptor {
    /// A nested controller stacked on `parent`.
    pub fn new(label: impl Into<String>, parent: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parent: parent.into(),
            help: help.into(),
            description: None,
            format: None,
            kind: ControllerKind::Local,
            stacking: Stacking::Nested,
            formatter: ArgumentFormatter::Raw,
            commands: Vec::new(),
        }
    }

    /// The root controller.
    pub fn base(help: impl Into<String>) -> Self {
        Self {
            kind: ControllerKind::Base,
            ..Self::new(BASE_LABEL, "", help)
        }
    }

    pub fn is_base(&self) -> bool {
        self.parent.is_empty() && self.label == BASE_LABEL
    }

    /// Full dotted path: `base` or `<parent>.<label>`.
    pub fn path(&self) -> String {
        if self.is_base() {
            BASE_LABEL.to_string()
        } else {
            format!("{}.{}", self.parent, self.label)
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn kind(mut self, kind: ControllerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.stacking = Stacking::Embedded;
        self
    }

    pub fn formatter(mut self, formatter: ArgumentFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn command(mut self, command: CommandDescriptor) -> Self {
        self.commands.push(command);
        self
    }

    pub fn find_command(&self, label: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|command| command.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_dotted_from_base() {
        assert_eq!(ControllerDescriptor::base("root").path(), "base");
        let nested = ControllerDescriptor::new("orchestrators", "base.environments", "orchestrator configs");
        assert_eq!(nested.path(), "base.environments.orchestrators");
    }

    #[test]
    fn collapse_formatter_joins_whitespace() {
        let text = "first line\n    second   line";
        assert_eq!(ArgumentFormatter::Raw.format(text), text);
        assert_eq!(ArgumentFormatter::Collapse.format(text), "first line second line");
    }
}

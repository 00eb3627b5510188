use std::{collections::HashSet, fmt, sync::Arc};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    BASE_LABEL, Controller, ControllerDescriptor, DISPATCH_ARGUMENT, GLOBAL_ARGUMENTS, PAGING_ARGUMENTS, RegistryError,
    Stacking,
};

/// Short flags taken by the global group and by `--help`.
const RESERVED_SHORTS: [char; 5] = ['y', 'e', 'f', 'k', 'h'];

/// A controller together with the descriptor it registered with.
#[derive(Clone)]
pub struct RegisteredController {
    pub path: String,
    pub descriptor: ControllerDescriptor,
    pub controller: Arc<dyn Controller>,
}

impl fmt::Debug for RegisteredController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredController")
            .field("path", &self.path)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Controllers keyed by their full dotted path, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    controllers: IndexMap<String, RegisteredController>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Controller + 'static>(&mut self, controller: C) -> Result<(), RegistryError> {
        self.register_shared(Arc::new(controller))
    }

    pub fn register_shared(&mut self, controller: Arc<dyn Controller>) -> Result<(), RegistryError> {
        let descriptor = controller.descriptor();
        let path = descriptor.path();
        if self.controllers.contains_key(&path) {
            return Err(RegistryError::DuplicateCommand { path });
        }
        let mut labels = HashSet::new();
        for command in &descriptor.commands {
            if !labels.insert(command.label.as_str()) {
                return Err(RegistryError::DuplicateCommand {
                    path: format!("{path}.{}", command.label),
                });
            }
        }
        debug!(controller = %path, commands = descriptor.commands.len(), "controller registered");
        self.controllers.insert(
            path.clone(),
            RegisteredController {
                path,
                descriptor,
                controller,
            },
        );
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&RegisteredController> {
        self.controllers.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredController> {
        self.controllers.values()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Controllers stacked directly on `path`.
    pub fn children<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a RegisteredController> + 'a {
        self.controllers.values().filter(move |entry| entry.descriptor.parent == path)
    }

    /// Command-line tokens leading to the namespace holding the commands of
    /// `path`. Embedded controllers share their parent's namespace.
    pub fn namespace(&self, path: &str) -> Option<Vec<String>> {
        let entry = self.controllers.get(path)?;
        if entry.descriptor.is_base() {
            return Some(Vec::new());
        }
        let mut tokens = self.namespace(&entry.descriptor.parent)?;
        if entry.descriptor.stacking == Stacking::Nested {
            tokens.push(entry.descriptor.label.clone());
        }
        Some(tokens)
    }

    /// Paths of the controllers reachable from `base` through parent links,
    /// depth first.
    pub fn walk(&self) -> Vec<String> {
        let mut visited = Vec::new();
        if !self.controllers.contains_key(BASE_LABEL) {
            return visited;
        }
        let mut stack = vec![BASE_LABEL.to_string()];
        while let Some(path) = stack.pop() {
            let mut children: Vec<String> = self.children(&path).map(|child| child.path.clone()).collect();
            children.reverse();
            stack.extend(children);
            visited.push(path);
        }
        visited
    }

    /// Deepest nested controller named by the leading `tokens`.
    pub fn resolve_prefix<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let mut current = BASE_LABEL.to_string();
        let mut namespace: Vec<String> = Vec::new();
        for token in tokens {
            namespace.push(token.as_ref().to_string());
            let next = self.controllers.values().find(|entry| {
                entry.descriptor.stacking == Stacking::Nested && self.namespace(&entry.path).as_ref() == Some(&namespace)
            });
            match next {
                Some(entry) => current = entry.path.clone(),
                None => break,
            }
        }
        current
    }

    /// Keep only what parsing a command under `target` needs: the namespaces
    /// on the way to it and the namespaces directly below it.
    pub fn prune(&self, target: &str) -> Result<ControllerRegistry, RegistryError> {
        let target_ns = self
            .namespace(target)
            .ok_or_else(|| RegistryError::UnknownController(target.to_string()))?;
        let controllers = self
            .controllers
            .iter()
            .filter(|(path, _)| {
                self.namespace(path).is_some_and(|ns| {
                    let on_path = ns.len() <= target_ns.len() && target_ns.starts_with(&ns);
                    let below = ns.len() == target_ns.len() + 1 && ns.starts_with(&target_ns);
                    on_path || below
                })
            })
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();
        Ok(Self { controllers })
    }

    /// Check the tree once every plugin has registered.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for entry in self.controllers.values() {
            let descriptor = &entry.descriptor;
            if !descriptor.is_base() && !self.controllers.contains_key(&descriptor.parent) {
                return Err(RegistryError::UnknownParent {
                    controller: entry.path.clone(),
                    parent: descriptor.parent.clone(),
                });
            }
        }

        let mut occupied = HashSet::new();
        for entry in self.controllers.values() {
            let Some(namespace) = self.namespace(&entry.path) else {
                continue;
            };
            if entry.descriptor.stacking == Stacking::Nested
                && !entry.descriptor.is_base()
                && !occupied.insert(namespace.join(" "))
            {
                return Err(RegistryError::DuplicateCommand { path: entry.path.clone() });
            }
            for command in &entry.descriptor.commands {
                let mut spelled = namespace.clone();
                spelled.push(command.label.clone());
                if !occupied.insert(spelled.join(" ")) {
                    return Err(RegistryError::DuplicateCommand {
                        path: format!("{}.{}", entry.path, command.label),
                    });
                }
                validate_arguments(&format!("{}.{}", entry.path, command.label), command)?;
            }
        }
        Ok(())
    }
}

fn validate_arguments(command_path: &str, command: &crate::CommandDescriptor) -> Result<(), RegistryError> {
    let collision = |argument: String| RegistryError::ArgumentCollision {
        command: command_path.to_string(),
        argument,
    };
    let mut seen = HashSet::new();
    for argument in &command.arguments {
        if !seen.insert(argument.dest.as_str()) {
            return Err(RegistryError::DuplicateArgument {
                command: command_path.to_string(),
                argument: argument.dest.clone(),
            });
        }
        let names = [Some(argument.dest.as_str()), argument.long.as_deref()];
        for name in names.into_iter().flatten() {
            let reserved = GLOBAL_ARGUMENTS.contains(&name)
                || name == DISPATCH_ARGUMENT
                || (command.paginated && PAGING_ARGUMENTS.contains(&name));
            if reserved {
                return Err(collision(name.to_string()));
            }
        }
        if let Some(short) = argument.short
            && RESERVED_SHORTS.contains(&short)
        {
            return Err(collision(format!("-{short}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandDescriptor, test_support::StubController};
    use beehive_types::ArgumentSpec;

    fn registry() -> ControllerRegistry {
        let mut registry = ControllerRegistry::new();
        for descriptor in [
            ControllerDescriptor::base("root").command(CommandDescriptor::new("version", "print the version")),
            ControllerDescriptor::new("entities", "base", "entities")
                .embedded()
                .command(CommandDescriptor::new("get", "get one")),
            ControllerDescriptor::new("environments", "base", "environments")
                .command(CommandDescriptor::new("list", "list them")),
            ControllerDescriptor::new("orchestrators", "base.environments", "orchestrators")
                .command(CommandDescriptor::new("list", "list them")),
            ControllerDescriptor::new("vms", "base", "virtual machines").command(CommandDescriptor::new("list", "vms")),
        ] {
            registry.register(StubController::new(descriptor)).expect("register");
        }
        registry
    }

    #[test]
    fn namespaces_skip_embedded_labels() {
        let registry = registry();
        assert_eq!(registry.namespace("base.entities"), Some(vec![]));
        assert_eq!(
            registry.namespace("base.environments.orchestrators"),
            Some(vec!["environments".to_string(), "orchestrators".to_string()])
        );
    }

    #[test]
    fn prefix_resolution_stops_at_the_first_unknown_token() {
        let registry = registry();
        assert_eq!(registry.resolve_prefix(&["environments", "orchestrators", "list"]), "base.environments.orchestrators");
        assert_eq!(registry.resolve_prefix(&["get", "42"]), "base");
        assert_eq!(registry.resolve_prefix::<&str>(&[]), "base");
    }

    #[test]
    fn pruning_keeps_the_path_and_the_level_below() {
        let registry = registry();
        let pruned = registry.prune("base.environments").expect("prune");
        let paths: Vec<&str> = pruned.iter().map(|entry| entry.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["base", "base.entities", "base.environments", "base.environments.orchestrators"]
        );
        assert!(matches!(
            registry.prune("base.nowhere"),
            Err(RegistryError::UnknownController(_))
        ));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let mut registry = registry();
        let err = registry
            .register(StubController::new(ControllerDescriptor::new("vms", "base", "again")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCommand { path } if path == "base.vms"));
    }

    #[test]
    fn validation_reports_unknown_parents() {
        let mut registry = registry();
        registry
            .register(StubController::new(ControllerDescriptor::new("orphan", "base.missing", "lost")))
            .expect("register");
        assert!(matches!(registry.validate(), Err(RegistryError::UnknownParent { .. })));
    }

    #[test]
    fn validation_reports_embedded_clashes() {
        let mut registry = registry();
        registry
            .register(StubController::new(
                ControllerDescriptor::new("other", "base", "clash")
                    .embedded()
                    .command(CommandDescriptor::new("get", "again")),
            ))
            .expect("register");
        assert!(matches!(
            registry.validate(),
            Err(RegistryError::DuplicateCommand { path }) if path == "base.other.get"
        ));
    }

    #[test]
    fn validation_reports_argument_problems() {
        let collide = ControllerDescriptor::new("a", "base", "a")
            .command(CommandDescriptor::new("run", "run").arg(ArgumentSpec::option("format")));
        let mut registry = registry();
        registry.register(StubController::new(collide)).expect("register");
        assert!(matches!(registry.validate(), Err(RegistryError::ArgumentCollision { argument, .. }) if argument == "format"));

        let paging = ControllerDescriptor::new("b", "base", "b")
            .command(CommandDescriptor::new("list", "list").paginated().arg(ArgumentSpec::option("size")));
        let mut registry = self::registry();
        registry.register(StubController::new(paging)).expect("register");
        assert!(matches!(registry.validate(), Err(RegistryError::ArgumentCollision { .. })));

        let twice = ControllerDescriptor::new("c", "base", "c").command(
            CommandDescriptor::new("run", "run")
                .arg(ArgumentSpec::option("id"))
                .arg(ArgumentSpec::positional("id")),
        );
        let mut registry = self::registry();
        registry.register(StubController::new(twice)).expect("register");
        assert!(matches!(registry.validate(), Err(RegistryError::DuplicateArgument { .. })));
    }

    #[test]
    fn the_sample_tree_is_valid_and_fully_reachable() {
        let registry = registry();
        registry.validate().expect("valid");
        assert_eq!(
            registry.walk(),
            vec!["base", "base.entities", "base.environments", "base.environments.orchestrators", "base.vms"]
        );
    }
}

use beehive_registry::{
    CommandContext, CommandDescriptor, Controller, ControllerDescriptor, ControllerKind, ControllerRegistry, KernelError,
    build_parser,
};
use beehive_types::{ArgumentKind, ArgumentSpec, ValueType};

struct Fixture(ControllerDescriptor);

#[async_trait::async_trait]
impl Controller for Fixture {
    fn descriptor(&self) -> ControllerDescriptor {
        self.0.clone()
    }

    async fn run(&self, _command: &str, _ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        Ok(())
    }
}

fn fixture_registry() -> ControllerRegistry {
    let descriptors = vec![
        ControllerDescriptor::base("Platform command line").command(CommandDescriptor::new("version", "print the version")),
        ControllerDescriptor::new("resource", "base", "resource subsystem")
            .kind(ControllerKind::platform("resource", "/v1.0/nrs"))
            .command(
                CommandDescriptor::new("get", "get entities")
                    .paginated()
                    .arg(ArgumentSpec::option("id").short('i').help("entity id"))
                    .arg(ArgumentSpec::option("tags").help("comma separated tags")),
            ),
        ControllerDescriptor::new("containers", "base.resource", "containers")
            .command(
                CommandDescriptor::new("add", "add a container")
                    .arg(ArgumentSpec::positional("name"))
                    .arg(ArgumentSpec::option("desc").kind(ArgumentKind::StringJoin))
                    .arg(ArgumentSpec::option("cores").value_type(ValueType::Int).default_value("1")),
            )
            .command(CommandDescriptor::new("ping", "ping a container").arg(ArgumentSpec::switch("deep"))),
        ControllerDescriptor::new("tags", "base.resource.containers", "container tags")
            .command(CommandDescriptor::new("tag-get", "list tags").arg(ArgumentSpec::positional("id"))),
        ControllerDescriptor::new("ssh", "base", "ssh nodes")
            .embedded()
            .command(CommandDescriptor::new("node-get", "get ssh nodes").arg(ArgumentSpec::option("verbose").short('v').kind(ArgumentKind::Count))),
    ];
    let mut registry = ControllerRegistry::new();
    for descriptor in descriptors {
        registry.register(Fixture(descriptor)).expect("register");
    }
    registry.validate().expect("valid tree");
    registry
}

#[test]
fn every_controller_is_reachable_through_its_parent() {
    let registry = fixture_registry();
    let walk = registry.walk();
    for entry in registry.iter() {
        let position = walk.iter().position(|path| path == &entry.path);
        assert!(position.is_some(), "{} unreachable", entry.path);
        if !entry.descriptor.is_base() {
            let parent = walk.iter().position(|path| path == &entry.descriptor.parent);
            assert!(parent < position, "{} visited before its parent", entry.path);
        }
    }
}

#[test]
fn every_command_help_names_its_label_and_flags() {
    let registry = fixture_registry();
    for entry in registry.iter() {
        let mut argv = vec!["beehive3".to_string()];
        argv.extend(registry.namespace(&entry.path).expect("namespace"));
        for command in &entry.descriptor.commands {
            let mut argv = argv.clone();
            argv.push(command.label.clone());
            argv.push("--help".to_string());
            let err = build_parser(&registry, "beehive3", None)
                .try_get_matches_from(&argv)
                .expect_err("help short-circuits parsing");
            let help = err.to_string();
            assert!(help.contains(&command.label), "{} missing label", command.label);
            for argument in &command.arguments {
                for spelling in argument.flag_spellings() {
                    assert!(help.contains(&spelling), "{spelling} missing from {} help", command.label);
                }
            }
            if command.paginated {
                for flag in ["--size", "--page", "--field", "--order"] {
                    assert!(help.contains(flag), "{flag} missing from {} help", command.label);
                }
            }
        }
    }
}

#[test]
fn pruned_parsers_still_parse_their_commands() {
    let registry = fixture_registry();
    let target = registry.resolve_prefix(&["resource", "containers", "add", "web"]);
    assert_eq!(target, "base.resource.containers");
    let pruned = registry.prune(&target).expect("prune");
    assert!(pruned.get("base.ssh").is_some(), "embedded in base stays");
    assert!(pruned.get("base.resource.containers.tags").is_some(), "direct child stays");
    let matches = build_parser(&pruned, "beehive3", None)
        .try_get_matches_from(["beehive3", "resource", "containers", "add", "web", "--desc", "a", "b"])
        .expect("parse");
    let (_, resource) = matches.subcommand().expect("resource");
    let (_, containers) = resource.subcommand().expect("containers");
    let (name, add) = containers.subcommand().expect("add");
    assert_eq!(name, "add");
    assert_eq!(add.get_one::<i64>("cores"), Some(&1));
}

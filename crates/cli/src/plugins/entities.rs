//! Entity commands of the `resource` subsystem, stacked into the root
//! namespace (`beehive3 get`, `beehive3 tag-add`, ...).

use beehive_api::{CallOptions, PageCollect, PageRequest};
use beehive_registry::{
    BASE_LABEL, CommandContext, CommandDescriptor, Controller, ControllerDescriptor, ControllerKind, ControllerRegistry,
    KernelError, Plugin, RegistryError,
};
use beehive_render::{RenderRequest, TreeWalk, emit_tree};
use beehive_types::{ArgumentKind, ArgumentSpec, ValueType, find_task_id};
use serde_json::{Map, Value, json};
use tracing::debug;

pub const SUBSYSTEM: &str = "resource";
pub const BASE_URI: &str = "/entities";

const FILTERS: [&str; 2] = ["name", "state"];

pub struct EntitiesPlugin;

impl Plugin for EntitiesPlugin {
    fn name(&self) -> &'static str {
        "entities"
    }

    fn load(&self, registry: &mut ControllerRegistry) -> Result<(), RegistryError> {
        registry.register(EntitiesController)
    }
}

pub struct EntitiesController;

fn id_argument() -> ArgumentSpec {
    ArgumentSpec::positional("id").value_type(ValueType::Int).help("entity id")
}

fn tags_argument() -> ArgumentSpec {
    ArgumentSpec::positional("tags").help("comma separated tags")
}

/// `foo, bar,,baz` -> `["foo", "bar", "baz"]`
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn entity_uri(ctx: &CommandContext<'_>) -> Result<String, KernelError> {
    let id = ctx
        .int("id")
        .ok_or_else(|| KernelError::Usage("missing value for 'id'".to_string()))?;
    Ok(format!("{}/{id}", ctx.base_uri()))
}

impl EntitiesController {
    async fn get(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = entity_uri(ctx)?;
        let api = ctx.api()?.clone();
        let reply = api.get(&uri, &CallOptions::new()).await?;
        ctx.render(RenderRequest::new(reply).key("entity").details())
    }

    async fn list(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = ctx.base_uri().to_string();
        let page = ctx.page_query();
        let filters: Vec<(&str, String)> = FILTERS
            .iter()
            .filter_map(|&key| ctx.str(key).map(|value| (key, value)))
            .collect();
        let api = ctx.api()?.clone();
        let reply = if page.size < -1 {
            let request = filters
                .into_iter()
                .fold(PageRequest::new(uri, "items").page(page), |request, (key, value)| {
                    request.filter(key, value)
                });
            api.get_pages(&request, PageCollect::All).await?
        } else {
            let options = CallOptions::new().query(filters).query(page.query_pairs());
            api.get(&uri, &options).await?
        };
        ctx.render(
            RenderRequest::new(reply)
                .key("items")
                .headers(["Id", "Name", "State"])
                .fields(["id", "name", "state"]),
        )
    }

    async fn create(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let name = ctx.require_str("name")?;
        let prompt = format!("You are about to create entity {name}. Are you sure [y/n]? ");
        if !ctx.confirm(&prompt)?.is_confirmed() {
            return Ok(());
        }
        let mut entity = Map::new();
        entity.insert("name".to_string(), Value::String(name.clone()));
        if let Some(desc) = ctx.str("desc") {
            entity.insert("desc".to_string(), Value::String(desc));
        }
        let uri = ctx.base_uri().to_string();
        let api = ctx.api()?.clone();
        let reply = api.post(&uri, &json!({"entity": entity}), &CallOptions::new()).await?;
        match find_task_id(&reply, None) {
            Some(task_id) => ctx.message(format!("entity {name} created (task {task_id})")),
            None => ctx.message(format!("entity {name} created")),
        }
    }

    async fn update(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = entity_uri(ctx)?;
        let mut entity = Map::new();
        for field in ["name", "desc"] {
            if let Some(value) = ctx.str(field) {
                entity.insert(field.to_string(), Value::String(value));
            }
        }
        if entity.is_empty() {
            return Err(KernelError::Usage("nothing to update: pass --name or --desc".to_string()));
        }
        let api = ctx.api()?.clone();
        api.put(&uri, &json!({"entity": entity}), &CallOptions::new()).await?;
        ctx.message(format!("entity {} updated", ctx.require_str("id")?))
    }

    async fn delete(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = entity_uri(ctx)?;
        let id = ctx.require_str("id")?;
        let prompt = format!("You are about to delete entity {id}. Are you sure [y/n]? ");
        if !ctx.confirm(&prompt)?.is_confirmed() {
            debug!(id = %id, "delete declined");
            return Ok(());
        }
        let api = ctx.api()?.clone();
        api.delete(&uri, &CallOptions::new()).await?;
        ctx.message(format!("entity {id} deleted"))
    }

    /// `tag-add` and `tag-del` share one body; `cmd` tells them apart.
    async fn change_tags(&self, ctx: &mut CommandContext<'_>, cmd: &str) -> Result<(), KernelError> {
        let uri = entity_uri(ctx)?;
        let id = ctx.require_str("id")?;
        let tags = split_tags(&ctx.require_str("tags")?);
        if tags.is_empty() {
            return Err(KernelError::Usage("no tags given".to_string()));
        }
        let body = json!({"resource": {"tags": {"cmd": cmd, "values": tags}}});
        let api = ctx.api()?.clone();
        api.put(&uri, &body, &CallOptions::new()).await?;
        let joined = tags.join(",");
        match cmd {
            "add" => ctx.message(format!("add tag {joined} to resource {id}")),
            _ => ctx.message(format!("delete tag {joined} from resource {id}")),
        }
    }

    async fn tag_get(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = format!("{}/tags", entity_uri(ctx)?);
        let api = ctx.api()?.clone();
        let reply = api.get(&uri, &CallOptions::new()).await?;
        ctx.render(RenderRequest::new(reply).key("tags").headers(["Tag"]))
    }

    async fn tree(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = format!("{}/tree", entity_uri(ctx)?);
        let api = ctx.api()?.clone();
        let reply = api.get(&uri, &CallOptions::new()).await?;
        if !ctx.format().is_textual() {
            return ctx.render(RenderRequest::new(reply));
        }
        let root = reply.get("entity").unwrap_or(&reply);
        let style = ctx.style();
        emit_tree(TreeWalk::new(root), &["id", "name"], &style, ctx.console.out())?;
        Ok(())
    }

    async fn ping(&self, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        let uri = format!("{}/ping", ctx.base_uri());
        let api = ctx.api()?.clone();
        api.get(&uri, &CallOptions::new()).await?;
        ctx.message(format!("{SUBSYSTEM} is alive"))
    }
}

#[async_trait::async_trait]
impl Controller for EntitiesController {
    fn descriptor(&self) -> ControllerDescriptor {
        ControllerDescriptor::new("entities", BASE_LABEL, "platform entities")
            .kind(ControllerKind::platform(SUBSYSTEM, BASE_URI))
            .embedded()
            .command(
                CommandDescriptor::new("get", "get one entity")
                    .example("beehive3 get --id 42")
                    .arg(
                        ArgumentSpec::option("id")
                            .short('i')
                            .value_type(ValueType::Int)
                            .required(true)
                            .help("entity id"),
                    ),
            )
            .command(
                CommandDescriptor::new("list", "list entities")
                    .description("A --size below -1 fetches every page in chunks of -size records.")
                    .paginated()
                    .arg(ArgumentSpec::option("name").help("only entities with this name"))
                    .arg(ArgumentSpec::option("state").help("only entities in this state")),
            )
            .command(
                CommandDescriptor::new("create", "create an entity")
                    .example("beehive3 create web --desc front end")
                    .arg(ArgumentSpec::positional("name").help("entity name"))
                    .arg(ArgumentSpec::option("desc").kind(ArgumentKind::StringJoin).help("description")),
            )
            .command(
                CommandDescriptor::new("update", "update an entity")
                    .arg(id_argument())
                    .arg(ArgumentSpec::option("name").help("new name"))
                    .arg(ArgumentSpec::option("desc").kind(ArgumentKind::StringJoin).help("new description")),
            )
            .command(CommandDescriptor::new("delete", "delete an entity").arg(id_argument()))
            .command(
                CommandDescriptor::new("tag-add", "add tags to an entity")
                    .example("beehive3 tag-add 7 foo,bar")
                    .arg(id_argument())
                    .arg(tags_argument()),
            )
            .command(
                CommandDescriptor::new("tag-del", "remove tags from an entity")
                    .arg(id_argument())
                    .arg(tags_argument()),
            )
            .command(CommandDescriptor::new("tag-get", "list the tags of an entity").arg(id_argument()))
            .command(CommandDescriptor::new("tree", "print an entity and its children").arg(id_argument()))
            .command(CommandDescriptor::new("ping", "check that the subsystem answers"))
    }

    async fn run(&self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        match command {
            "get" => self.get(ctx).await,
            "list" => self.list(ctx).await,
            "create" => self.create(ctx).await,
            "update" => self.update(ctx).await,
            "delete" => self.delete(ctx).await,
            "tag-add" => self.change_tags(ctx, "add").await,
            "tag-del" => self.change_tags(ctx, "delete").await,
            "tag-get" => self.tag_get(ctx).await,
            "tree" => self.tree(ctx).await,
            "ping" => self.ping(ctx).await,
            other => Err(KernelError::Usage(format!("unknown command '{other}'"))),
        }
    }
}

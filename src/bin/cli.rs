//! BridgeDB CLI - Main entry point for CLI binary
//!
//! This binary provides the `bridgedb` CLI tool for seeding and querying
//! a project's SQL and key-value stores.

use anyhow::{anyhow, Context};
use bridgedb_lib::engine::{
    cli::{formatter::CliFormatter, Cli, Commands, OutputFormat},
    config::Config,
    database::Database,
    hybrid::{EntityDictionary, FilterExpression, Predicate},
    kv::{JsonFileKvStore, KeyCodec, KeyValueStore, OwnerPrefixCodec},
    model::{Entity, EntityType, User},
    store::MultiplexTransaction,
};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        CliFormatter::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let project_dir = cli.get_project_dir();
    let json_output = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Init { name } => cmd_init(&name, &project_dir, json_output),
        Commands::AddUser { id, name, special_action } => {
            cmd_add_user(&project_dir, id, &name, special_action, json_output)
        }
        Commands::AddAction { owner, id, description } => {
            cmd_add_action(&project_dir, &owner, &id, &description, json_output)
        }
        Commands::Actions { owner } => cmd_actions(&project_dir, owner.as_deref(), json_output),
        Commands::Action { id, owner } => cmd_action(&project_dir, &id, owner.as_deref(), json_output),
        Commands::Bridge { user, relation, lookup_id } => {
            cmd_bridge(&project_dir, &user, &relation, lookup_id.as_deref(), json_output)
        }
        Commands::Status => cmd_status(&project_dir, json_output),
    }
}

fn load_config(project_dir: &Path) -> anyhow::Result<Config> {
    Config::load(project_dir).with_context(|| format!("loading project in {}", project_dir.display()))
}

fn owner_filter(config: &Config, owner: &str) -> anyhow::Result<FilterExpression> {
    Ok(Predicate::in_list(&config.kv.owner_field, [owner])?.into())
}

fn print_entities(entities: &[Entity], json: bool) -> anyhow::Result<()> {
    if json {
        let data: Vec<_> = entities.iter().map(Entity::to_json).collect();
        println!("{}", serde_json::json!({ "count": data.len(), "data": data }));
    } else {
        CliFormatter::entities(entities);
    }
    Ok(())
}

fn cmd_init(name: &str, project_dir: &Path, json: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(project_dir)?;

    let config = Config::default_for_project(name);
    config.save(project_dir)?;
    config.open_federation(project_dir)?;

    if json {
        println!("{}", serde_json::json!({
            "success": true,
            "project_dir": project_dir.display().to_string(),
            "name": name
        }));
    } else {
        CliFormatter::success(&format!("Created BridgeDB project: {}", name));
        CliFormatter::kv("Directory", &project_dir.display().to_string());
    }
    Ok(())
}

fn cmd_add_user(
    project_dir: &Path,
    id: i64,
    name: &str,
    special_action: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let db = Database::new(&project_dir.join(&config.database.path))?;

    let mut user = User::new(id, name);
    user.special_action_id = special_action;
    db.insert_user(&user)?;

    if json {
        println!("{}", serde_json::json!({ "success": true, "user": user }));
    } else {
        CliFormatter::success(&format!("Saved user {} ({})", user.id, user.name));
    }
    Ok(())
}

fn cmd_add_action(project_dir: &Path, owner: &str, id: &str, description: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let kv = JsonFileKvStore::open(&project_dir.join(&config.kv.path))?;
    let codec = OwnerPrefixCodec::new(&config.kv.owner_prefix);

    let key = codec.encode(owner, id);
    kv.hset(EntityType::Action.canonical_name(), &key, description)?;

    if json {
        println!("{}", serde_json::json!({ "success": true, "key": key }));
    } else {
        CliFormatter::success(&format!("Stored {}", key));
    }
    Ok(())
}

fn cmd_actions(project_dir: &Path, owner: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let federation = config.open_federation(project_dir)?;
    let mux = federation.begin_read_transaction();
    let scope = federation.scope();

    let filter = owner.map(|o| owner_filter(&config, o)).transpose()?;
    let actions = mux.load_objects(EntityType::Action, filter.as_ref(), None, None, &scope)?;
    print_entities(&actions, json)
}

fn cmd_action(project_dir: &Path, id: &str, owner: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let federation = config.open_federation(project_dir)?;
    let mux = federation.begin_read_transaction();
    let scope = federation.scope();

    let filter = owner.map(|o| owner_filter(&config, o)).transpose()?;
    let action = mux
        .load_object(EntityType::Action, id, filter.as_ref(), &scope)?
        .ok_or_else(|| anyhow!("Action {} not found", id))?;
    print_entities(&[action], json)
}

fn cmd_bridge(
    project_dir: &Path,
    user: &str,
    relation: &str,
    lookup_id: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let federation = config.open_federation(project_dir)?;
    let mux = federation.begin_read_transaction();
    let scope = federation.scope();

    let parent = mux
        .load_object(EntityType::User, user, None, &scope)?
        .ok_or_else(|| anyhow!("User {} not found", user))?;

    let related = match lookup_id {
        Some(id) => mux
            .get_relation_object(&parent, relation, id, None, &scope)?
            .into_iter()
            .collect(),
        None => mux.get_relation(&parent, relation, None, None, None, &scope)?,
    };
    print_entities(&related, json)
}

fn cmd_status(project_dir: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(project_dir)?;
    let db = Database::open(&project_dir.join(&config.database.path))?;
    let kv = JsonFileKvStore::open(&project_dir.join(&config.kv.path))?;
    let federation = config.open_federation(project_dir)?;
    let dictionary = federation.dictionary();

    let users = db.count_users()?;
    let actions = kv.hgetall(EntityType::Action.canonical_name())?.len();
    let namespaces = kv.namespaces()?;
    let bridges: Vec<String> = config.bridges.iter().map(|b| b.relation().to_string()).collect();
    let relations: Vec<String> = dictionary
        .relations_of(EntityType::User)
        .into_iter()
        .map(|(name, target)| match dictionary.engine_of(target) {
            Some(engine) => format!("{} -> {} ({:?})", name, target, engine),
            None => format!("{} -> {}", name, target),
        })
        .collect();

    if json {
        println!("{}", serde_json::json!({
            "project": config.project.name,
            "users": users,
            "actions": actions,
            "namespaces": namespaces,
            "relations": relations,
            "bridges": bridges,
        }));
    } else {
        CliFormatter::header(&format!("BridgeDB project: {}", config.project.name));
        CliFormatter::kv("Users", &users.to_string());
        CliFormatter::kv("Actions", &actions.to_string());
        CliFormatter::kv("Namespaces", &namespaces.join(", "));
        CliFormatter::kv("Bridges", &bridges.join(", "));
        CliFormatter::header("Relations");
        for relation in &relations {
            CliFormatter::table_row(&[relation.as_str()]);
        }
    }
    Ok(())
}

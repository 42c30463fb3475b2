//! Subcommand implementations
//!
//! Every command returns the text to print so it can be tested without a
//! terminal.

use crate::settings::FolioSettings;
use anyhow::{bail, Context};
use clap::ArgMatches;
use folio_config::{config_to_json, DecoratedConfig, MapConfig, PluginConfig};
use folio_expr::{
    EngineLimits, ExpressionEngine, InMemorySecurityService, Sandbox, UserModel, UserRecord,
};
use folio_model::{ItemModel, NodeModel, ObservableTreeModel, TreeModelEvent, TreeObserver};
use folio_repo::{InMemoryRepository, ItemPath};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One scripted repository change
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create node `name` below `parent`
    Add {
        /// Parent path
        parent: ItemPath,
        /// New node name
        name: String,
        /// Primary node type
        #[serde(rename = "type", default = "default_node_type")]
        primary_type: String,
    },
    /// Remove the node at `path`
    Remove {
        /// Node path
        path: ItemPath,
    },
    /// Move the node at `from` to `to`
    Move {
        /// Source path
        from: ItemPath,
        /// Destination path
        to: ItemPath,
    },
    /// Set property `name` on `node`
    SetProperty {
        /// Owning node
        node: ItemPath,
        /// Property name
        name: String,
        /// New value
        value: serde_json::Value,
    },
}

fn default_node_type() -> String {
    "nt:unstructured".to_string()
}

impl Operation {
    fn apply(&self, repo: &InMemoryRepository) -> anyhow::Result<()> {
        match self {
            Self::Add {
                parent,
                name,
                primary_type,
            } => {
                repo.add_node(parent, name, primary_type)?;
            }
            Self::Remove { path } => repo.remove_node(path)?,
            Self::Move { from, to } => repo.move_node(from, to)?,
            Self::SetProperty { node, name, value } => {
                repo.set_property(node, name, value.clone())?;
            }
        }
        Ok(())
    }
}

/// Dispatch parsed arguments to a command
///
/// # Errors
/// Returns the command's error
pub fn run(matches: &ArgMatches, settings: &FolioSettings) -> anyhow::Result<String> {
    match matches.subcommand() {
        Some(("eval", args)) => eval(
            settings,
            required::<String>(args, "expression")?,
            required::<String>(args, "user")?,
            args.get_one::<PathBuf>("users").map(PathBuf::as_path),
            args.get_one::<bool>("default").copied(),
        ),
        Some(("lookup", args)) => lookup(
            required::<PathBuf>(args, "fixture")?,
            required::<String>(args, "root")?,
            required::<String>(args, "target")?,
        ),
        Some(("config", args)) => config(
            required::<PathBuf>(args, "config")?,
            args.get_one::<PathBuf>("fallback").map(PathBuf::as_path),
            args.get_one::<String>("key").map(String::as_str),
        ),
        Some(("observe", args)) => observe(
            required::<PathBuf>(args, "fixture")?,
            required::<String>(args, "root")?,
            required::<PathBuf>(args, "script")?,
        ),
        Some((name, _)) => bail!("unknown command: {name}"),
        None => bail!("no command given"),
    }
}

fn required<'a, T>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a T>
where
    T: std::any::Any + Clone + Send + Sync + 'static,
{
    args.get_one::<T>(id)
        .with_context(|| format!("missing argument <{id}>"))
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn item_path(raw: &str) -> anyhow::Result<ItemPath> {
    raw.parse::<ItemPath>()
        .with_context(|| format!("invalid item path: {raw}"))
}

fn load_repository(fixture: &Path) -> anyhow::Result<Arc<InMemoryRepository>> {
    let repo = InMemoryRepository::from_yaml(&read(fixture)?)
        .with_context(|| format!("invalid fixture {}", fixture.display()))?;
    tracing::debug!(fixture = %fixture.display(), nodes = repo.node_count(), "fixture loaded");
    Ok(Arc::new(repo))
}

/// Evaluate `expression` for `user`
///
/// With `default` set the expression is evaluated as a condition and
/// failures print the default instead of erroring.
///
/// # Errors
/// Returns error if the user file cannot be loaded or evaluation fails
pub fn eval(
    settings: &FolioSettings,
    expression: &str,
    user: &str,
    users: Option<&Path>,
    default: Option<bool>,
) -> anyhow::Result<String> {
    let records: Vec<UserRecord> = match users {
        Some(path) => serde_yaml::from_str(&read(path)?)
            .with_context(|| format!("invalid user records in {}", path.display()))?,
        None => Vec::new(),
    };
    let security = Arc::new(InMemorySecurityService::from_records(records));
    let user = UserModel::new(user, security);

    let owned;
    let engine = if settings.engine_limits() == EngineLimits::default() {
        ExpressionEngine::instance()?
    } else {
        owned = ExpressionEngine::new(Sandbox::default(), settings.engine_limits())?;
        &owned
    };

    let output = match default {
        Some(default) => engine.evaluate_boolean(expression, &user, default).to_string(),
        None => engine
            .evaluate(expression, &user)
            .with_context(|| format!("failed to evaluate `{expression}`"))?
            .to_string(),
    };
    Ok(output)
}

/// Print the tree path from `root` to `target`, one node per line
///
/// # Errors
/// Returns error if the fixture cannot be loaded or `target` is not
/// reachable from `root`
pub fn lookup(fixture: &Path, root: &str, target: &str) -> anyhow::Result<String> {
    let repo = load_repository(fixture)?;
    let tree = ObservableTreeModel::new(NodeModel::from_path(repo.clone(), item_path(root)?));
    let target_item = ItemModel::from_path(repo, item_path(target)?);

    let Some(tree_path) = tree.lookup(&target_item)? else {
        bail!("{target} is not reachable from {root}");
    };

    let mut output = String::new();
    for node in tree_path.iter() {
        let Some(handle) = node.resolve()? else {
            bail!("{} disappeared during lookup", node.identity());
        };
        let marker = if node.is_virtual() { " (virtual)" } else { "" };
        writeln!(output, "{}\t{}{marker}", handle.path, handle.primary_type)?;
    }
    Ok(output)
}

fn load_config(path: &Path) -> anyhow::Result<MapConfig> {
    let text = read(path)?;
    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => MapConfig::from_json(&text),
        _ => MapConfig::from_yaml(&text),
    };
    config.with_context(|| format!("invalid configuration {}", path.display()))
}

/// Print a configuration as JSON, resolving placeholders through `fallback`
///
/// # Errors
/// Returns error if a file cannot be loaded or `key` is absent
pub fn config(path: &Path, fallback: Option<&Path>, key: Option<&str>) -> anyhow::Result<String> {
    let base: Arc<dyn PluginConfig> = Arc::new(load_config(path)?);
    let config: Arc<dyn PluginConfig> = match fallback {
        Some(fallback) => Arc::new(DecoratedConfig::new(base, Arc::new(load_config(fallback)?))),
        None => base,
    };

    let json = match key {
        Some(key) => config
            .get(key)
            .with_context(|| format!("no value for key '{key}'"))?
            .to_json(),
        None => config_to_json(config.as_ref()),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

#[derive(Default)]
struct EventLog {
    lines: Mutex<Vec<String>>,
}

impl TreeObserver for EventLog {
    fn on_tree_event(&self, event: &TreeModelEvent) {
        self.lines
            .lock()
            .push(format!("{:?}\t{}", event.kind(), event.path()));
    }
}

/// Apply `script` below an observed tree and print the delivered events
///
/// # Errors
/// Returns error if an input cannot be loaded, observation cannot start,
/// or an operation fails
pub fn observe(fixture: &Path, root: &str, script: &Path) -> anyhow::Result<String> {
    let repo = load_repository(fixture)?;
    let operations: Vec<Operation> = serde_yaml::from_str(&read(script)?)
        .with_context(|| format!("invalid script {}", script.display()))?;

    let mut tree = ObservableTreeModel::new(NodeModel::from_path(repo.clone(), item_path(root)?));
    let log = Arc::new(EventLog::default());
    tree.subscribe(log.clone());
    tree.start_observation()?;

    for (index, operation) in operations.iter().enumerate() {
        operation
            .apply(&repo)
            .with_context(|| format!("operation {} ({operation:?}) failed", index + 1))?;
    }
    repo.sync();
    let delivered = tree.process_pending();
    tree.stop_observation();
    tracing::debug!(operations = operations.len(), delivered, "script applied");

    let lines = log.lines.lock();
    let mut output = String::new();
    for line in lines.iter() {
        writeln!(output, "{line}")?;
    }
    Ok(output)
}

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};
use tracing::info;

use shapeshot_diff::{diff_graphs, ShapeChange, ShapeDiff, SurfaceMode};
use shapeshot_graph::{CaptureOptions, CaptureReport, GraphConfig, GraphRecord, ObjectGraph};
use shapeshot_host::HostValue;
use shapeshot_types::{NodeId, PropertyMeta};

use crate::cli::*;
use crate::demo;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Summary(args) => cmd_summary(&load_graph(&args.file, &config)?, format),
        Command::Ids(args) => cmd_ids(&load_graph(&args.file, &config)?, format),
        Command::Members(args) => cmd_members(args, &config, format),
        Command::Keys(args) => cmd_keys(args, &config, format),
        Command::Lookup(args) => cmd_lookup(args, &config, format),
        Command::Prune(args) => cmd_prune(args, &config, format),
        Command::Diff(args) => cmd_diff(args, &config, format),
        Command::Demo(args) => cmd_demo(args, config, format),
    }
}

// ---------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------

fn load_config(path: Option<&Path>) -> anyhow::Result<GraphConfig> {
    let Some(path) = path else {
        return Ok(GraphConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    GraphConfig::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn load_graph(path: &Path, config: &GraphConfig) -> anyhow::Result<ObjectGraph> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let record: GraphRecord = serde_json::from_str(&text)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    ObjectGraph::from_record_with_config(record, config.clone())
        .with_context(|| format!("loading snapshot {}", path.display()))
}

fn save_graph(graph: &ObjectGraph, path: &Path) -> anyhow::Result<()> {
    let json = graph.to_json()?;
    fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))
}

fn emit_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn describe(graph: &ObjectGraph, id: NodeId) -> String {
    match graph.get_type(id) {
        Some(ty) => ty.name().to_string(),
        None if graph.is_function(id) => format!("function #{id}"),
        None => format!("object #{id}"),
    }
}

fn flags(meta: &PropertyMeta) -> String {
    [
        (meta.writable, 'w'),
        (meta.enumerable, 'e'),
        (meta.configurable, 'c'),
        (meta.get, 'g'),
        (meta.set, 's'),
    ]
    .iter()
    .map(|&(on, c)| if on { c } else { '-' })
    .collect()
}

fn require_stored(graph: &ObjectGraph, id: NodeId) -> anyhow::Result<()> {
    if !graph.get_all_ids().contains(&id) {
        bail!("node {id} is not stored in this snapshot");
    }
    Ok(())
}

// ---------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------

fn cmd_summary(graph: &ObjectGraph, format: OutputFormat) -> anyhow::Result<()> {
    let paths = graph.get_all_keys_map().len();
    let timestamp = graph.timestamp().map(|t| t.to_rfc3339());

    if format == OutputFormat::Json {
        return emit_json(&json!({
            "key": graph.key(),
            "root": graph.root(),
            "objects": graph.len(),
            "functions": graph.get_functions().len(),
            "paths": paths,
            "timestamp": timestamp,
            "userAgent": graph.user_agent(),
            "environment": graph.environment(),
        }));
    }

    let root = graph
        .root()
        .map(|id| describe(graph, id))
        .unwrap_or_else(|| "none".into());
    println!("Snapshot {} (root: {})", graph.key().bold(), root.cyan());
    println!("  Captured:    {}", timestamp.unwrap_or_else(|| "never".into()));
    println!("  Environment: {}", graph.environment().to_string().yellow());
    println!("  Objects:     {}", graph.len().to_string().bold());
    println!("  Functions:   {}", graph.get_functions().len());
    println!("  Paths:       {}", paths);
    Ok(())
}

fn cmd_ids(graph: &ObjectGraph, format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<(NodeId, Option<String>)> = graph
        .get_all_ids()
        .into_iter()
        .map(|id| (id, graph.get_shortest_key(id)))
        .collect();

    if format == OutputFormat::Json {
        let rows: Vec<Value> = rows
            .iter()
            .map(|(id, path)| {
                json!({ "id": id, "function": graph.is_function(*id), "path": path })
            })
            .collect();
        return emit_json(&Value::Array(rows));
    }

    for (id, path) in rows {
        let kind = if graph.is_function(id) { "fn " } else { "obj" };
        let path = match path {
            Some(p) if p.is_empty() => "(root)".dimmed().to_string(),
            Some(p) => p,
            None => "(unreachable)".red().to_string(),
        };
        println!("{:>6} {} {}", id.to_string().yellow(), kind.dimmed(), path);
    }
    Ok(())
}

fn cmd_members(args: MembersArgs, config: &GraphConfig, format: OutputFormat) -> anyhow::Result<()> {
    let graph = load_graph(&args.file, config)?;
    require_stored(&graph, args.id)?;
    let keys = graph.get_object_keys_filtered(args.id, |_, value| {
        !args.objects || !value.is_type()
    });

    if format == OutputFormat::Json {
        let rows: Vec<Value> = keys
            .iter()
            .map(|key| {
                json!({
                    "key": key,
                    "name": graph.original_name(key),
                    "value": graph.get_property(args.id, key),
                    "meta": graph.get_metadata(args.id, key),
                })
            })
            .collect();
        return emit_json(&Value::Array(rows));
    }

    if let Some(parent) = graph.get_prototype(args.id) {
        println!("{} {}", "__proto__".dimmed(), describe(&graph, parent).cyan());
    }
    for key in &keys {
        let value = graph
            .get_property(args.id, key)
            .map(|v| describe(&graph, v))
            .unwrap_or_default();
        let flags = graph
            .get_metadata(args.id, key)
            .map(flags)
            .unwrap_or_else(|| "?????".into());
        let name = graph.original_name(key);
        let label = if name == key {
            key.bold().to_string()
        } else {
            format!("{} ({})", key.bold(), name.dimmed())
        };
        println!("{} {} {}", flags.dimmed(), label, value.cyan());
    }
    Ok(())
}

fn cmd_keys(args: KeysArgs, config: &GraphConfig, format: OutputFormat) -> anyhow::Result<()> {
    let graph = load_graph(&args.file, config)?;
    let mut keys = graph.get_keys(args.id);
    if args.shortest {
        keys.truncate(1);
    }

    if format == OutputFormat::Json {
        return emit_json(&json!({ "id": args.id, "paths": keys }));
    }
    if keys.is_empty() {
        println!("No path reaches {}.", args.id.to_string().yellow());
    }
    for key in keys {
        println!("{}", if key.is_empty() { "(root)".into() } else { key });
    }
    Ok(())
}

fn cmd_lookup(args: LookupArgs, config: &GraphConfig, format: OutputFormat) -> anyhow::Result<()> {
    let graph = load_graph(&args.file, config)?;
    let found = graph.lookup(&args.path, args.from);

    if format == OutputFormat::Json {
        return emit_json(&json!({ "path": args.path, "result": found }));
    }
    match found {
        Some(id) => println!("{} → {}", args.path.bold(), describe(&graph, id).cyan()),
        None => println!("{} {}", args.path.bold(), "does not resolve".red()),
    }
    Ok(())
}

// ---------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------

fn prune_graph(
    graph: &mut ObjectGraph,
    remove: &[NodeId],
    primitives: &[(NodeId, String)],
) -> anyhow::Result<usize> {
    let removed = graph.remove_ids(remove);
    graph
        .remove_primitives(primitives.iter().map(|(id, key)| (*id, key.as_str())))
        .context("removing primitive entries")?;
    Ok(removed)
}

fn cmd_prune(args: PruneArgs, config: &GraphConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut graph = load_graph(&args.file, config)?;
    let before = graph.len();
    let removed = prune_graph(&mut graph, &args.remove, &args.primitive)?;
    save_graph(&graph, &args.output)?;
    info!(removed, output = %args.output.display(), "pruned snapshot");

    if format == OutputFormat::Json {
        return emit_json(&json!({
            "removed": removed,
            "primitives": args.primitive.len(),
            "objects": graph.len(),
        }));
    }
    println!(
        "{} Removed {} of {} objects and {} primitive entries",
        "✓".green().bold(),
        removed.to_string().bold(),
        before,
        args.primitive.len()
    );
    println!("  Written to {}", args.output.display().to_string().blue());
    Ok(())
}

// ---------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------

fn cmd_diff(args: DiffArgs, config: &GraphConfig, format: OutputFormat) -> anyhow::Result<()> {
    let old = load_graph(&args.old, config)?;
    let new = load_graph(&args.new, config)?;
    let mode = if args.all_paths {
        SurfaceMode::AllPaths
    } else {
        SurfaceMode::Shortest
    };
    let diff = diff_graphs(&old, &new, mode);

    if format == OutputFormat::Json {
        return emit_json(&serde_json::to_value(&diff)?);
    }
    print_diff(&diff);
    Ok(())
}

fn print_diff(diff: &ShapeDiff) {
    if diff.is_empty() {
        println!("No changes.");
        return;
    }
    for change in &diff.changes {
        match change {
            ShapeChange::Added { path, shape } => {
                println!("{} {} {}", "+".green(), path, shape.to_string().dimmed())
            }
            ShapeChange::Removed { path, shape } => {
                println!("{} {} {}", "-".red(), path, shape.to_string().dimmed())
            }
            ShapeChange::Changed { path, old, new } => {
                println!("{} {} {} → {}", "~".yellow(), path, old, new)
            }
        }
    }
    println!(
        "\n{} added, {} removed, {} changed",
        diff.additions().to_string().green(),
        diff.removals().to_string().red(),
        diff.modifications().to_string().yellow()
    );
}

// ---------------------------------------------------------------
// Demo capture
// ---------------------------------------------------------------

fn capture_demo(
    flavor: Flavor,
    key: &str,
    mut config: GraphConfig,
) -> anyhow::Result<(ObjectGraph, CaptureReport)> {
    if config.vendor_alias_classes.is_empty() {
        config.vendor_alias_classes = vec!["CSSStyleDeclaration".into()];
    }
    let mut graph = ObjectGraph::with_config(config);
    let root = HostValue::object(demo::window(flavor));
    let options = CaptureOptions::with_key(key).user_agent(demo::user_agent(flavor));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let report = runtime.block_on(graph.capture(&root, options))?;
    Ok((graph, report))
}

fn cmd_demo(args: DemoArgs, config: GraphConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (graph, report) = capture_demo(args.flavor, &args.key, config)?;
    save_graph(&graph, &args.output)?;

    if format == OutputFormat::Json {
        return emit_json(&json!({
            "output": args.output.display().to_string(),
            "root": report.root,
            "objects": report.objects,
            "tasks": report.tasks,
            "batches": report.batches,
        }));
    }
    println!(
        "{} Captured {} objects in {} batches ({} tasks)",
        "✓".green().bold(),
        report.objects.to_string().bold(),
        report.batches,
        report.tasks
    );
    println!("  Environment: {}", graph.environment().to_string().yellow());
    println!("  Written to {}", args.output.display().to_string().blue());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapeshot_types::PrimitiveType;

    fn demo_file(dir: &Path, name: &str, flavor: Flavor) -> std::path::PathBuf {
        let path = dir.join(name);
        let (graph, _) = capture_demo(flavor, "window", GraphConfig::default()).unwrap();
        save_graph(&graph, &path).unwrap();
        path
    }

    #[test]
    fn demo_snapshot_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = demo_file(dir.path(), "chromium.json", Flavor::Chromium);
        let graph = load_graph(&path, &GraphConfig::default()).unwrap();

        assert_eq!(graph.key(), "window");
        assert_eq!(graph.environment().name, "Chrome");
        let root = graph.root().unwrap();
        assert_eq!(graph.lookup("window.self", None), Some(root));
        assert_eq!(
            graph.lookup("window.location.ancestorOrigins", None),
            Some(PrimitiveType::Exception.sentinel())
        );
        assert!(graph.lookup("window.style.webkitTransform", None).is_some());
        assert!(graph.lookup("window.navigator.toString", None).is_some());
    }

    #[test]
    fn prune_writes_a_smaller_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = demo_file(dir.path(), "in.json", Flavor::Gecko);
        let mut graph = load_graph(&path, &GraphConfig::default()).unwrap();
        let nav = graph.lookup("window.navigator", None).unwrap();

        let removed = prune_graph(&mut graph, &[nav], &[]).unwrap();
        assert_eq!(removed, 1);
        let out = dir.path().join("out.json");
        save_graph(&graph, &out).unwrap();

        let pruned = load_graph(&out, &GraphConfig::default()).unwrap();
        assert!(!pruned.get_all_ids().contains(&nav));
        assert_eq!(pruned.lookup("window.navigator", None), None);
    }

    #[test]
    fn prune_refuses_object_entries_as_primitives() {
        let dir = tempfile::tempdir().unwrap();
        let path = demo_file(dir.path(), "in.json", Flavor::Chromium);
        let mut graph = load_graph(&path, &GraphConfig::default()).unwrap();
        let root = graph.root().unwrap();

        let err = prune_graph(&mut graph, &[], &[(root, "navigator".into())]).unwrap_err();
        assert!(format!("{err:#}").contains("not a primitive"));
    }

    #[test]
    fn flavors_differ_in_surface() {
        let (chromium, _) = capture_demo(Flavor::Chromium, "window", GraphConfig::default()).unwrap();
        let (gecko, _) = capture_demo(Flavor::Gecko, "window", GraphConfig::default()).unwrap();
        let diff = diff_graphs(&chromium, &gecko, SurfaceMode::Shortest);

        let removed: Vec<&str> = diff
            .changes
            .iter()
            .filter(|c| matches!(c, ShapeChange::Removed { .. }))
            .map(ShapeChange::path)
            .collect();
        assert!(removed.contains(&"window.chrome"));
        assert!(diff
            .changes
            .iter()
            .any(|c| c.path() == "window.InstallTrigger"));
    }

    #[test]
    fn config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shapeshot.toml");
        fs::write(&path, "blacklisted_keys = [\"__proto__\", \"fetch\"]\nbatch_size = 4\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.batch_size, 4);

        let (graph, report) = capture_demo(Flavor::Chromium, "w", config).unwrap();
        assert!(report.batches > 1);
        assert_eq!(graph.lookup("w.fetch", None), None);
        assert!(graph.lookup("w.alert", None).is_some());
    }

    #[test]
    fn missing_files_report_their_path() {
        let err = load_graph(Path::new("/nonexistent/graph.json"), &GraphConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/graph.json"));
    }

    #[test]
    fn flag_rendering() {
        let meta = PropertyMeta {
            writable: true,
            configurable: true,
            get: true,
            ..Default::default()
        };
        assert_eq!(flags(&meta), "w-cg-");
    }
}

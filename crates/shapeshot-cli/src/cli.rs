use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use shapeshot_types::NodeId;

#[derive(Parser)]
#[command(
    name = "shapeshot",
    about = "shapeshot: capture, query and compare object graph snapshots",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Graph configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what a snapshot contains
    Summary(FileArgs),
    /// List every stored identity with its shortest path
    Ids(FileArgs),
    /// List the members of one object
    Members(MembersArgs),
    /// Show the paths that reach an identity
    Keys(KeysArgs),
    /// Resolve a path to an identity
    Lookup(LookupArgs),
    /// Remove identities or primitive entries and write a new snapshot
    Prune(PruneArgs),
    /// Compare the surfaces of two snapshots
    Diff(DiffArgs),
    /// Capture a built-in demo surface to a file
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct MembersArgs {
    pub file: PathBuf,
    pub id: NodeId,
    /// Only list members holding objects
    #[arg(long)]
    pub objects: bool,
}

#[derive(Args)]
pub struct KeysArgs {
    pub file: PathBuf,
    pub id: NodeId,
    #[arg(long)]
    pub shortest: bool,
}

#[derive(Args)]
pub struct LookupArgs {
    pub file: PathBuf,
    pub path: String,
    /// Resolve relative to this identity instead of the capture root
    #[arg(long)]
    pub from: Option<NodeId>,
}

#[derive(Args)]
pub struct PruneArgs {
    pub file: PathBuf,
    #[arg(long, num_args = 1..)]
    pub remove: Vec<NodeId>,
    /// Primitive entries to delete, as `<id>:<key>`
    #[arg(long, value_parser = parse_entry)]
    pub primitive: Vec<(NodeId, String)>,
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Compare every path instead of each object's shortest one
    #[arg(long)]
    pub all_paths: bool,
}

#[derive(Args)]
pub struct DemoArgs {
    #[arg(short, long)]
    pub output: PathBuf,
    #[arg(long, default_value = "window")]
    pub key: String,
    #[arg(long, default_value = "chromium")]
    pub flavor: Flavor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Flavor {
    Chromium,
    Gecko,
}

fn parse_entry(s: &str) -> Result<(NodeId, String), String> {
    let (id, key) = s
        .split_once(':')
        .ok_or_else(|| format!("expected <id>:<key>, got {s:?}"))?;
    let id = id.parse::<NodeId>().map_err(|e| e.to_string())?;
    Ok((id, key.to_string()))
}

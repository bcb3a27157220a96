use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lightgrok", about = "Index a source tree and grep it through the index")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the index stores
    #[arg(long, global = true)]
    pub index_root: Option<PathBuf>,

    /// Log per-file decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the index for a source root
    Index(IndexArgs),

    /// Search an indexed root for a case-insensitive substring
    Search(SearchArgs),

    /// Print where the index for a root is stored
    Locate(LocateArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Source directory or file to index
    pub root: PathBuf,

    /// Replace documents in the existing store instead of rebuilding it
    #[arg(long)]
    pub update: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Root that was indexed
    pub root: PathBuf,

    /// Text to look for
    pub query: String,

    /// Print paths relative to the root as ./path
    #[arg(long)]
    pub strip_root: bool,

    /// Maximum number of candidate files to re-scan
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// One JSON object per match
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    pub root: PathBuf,
}
